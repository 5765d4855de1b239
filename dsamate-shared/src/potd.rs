//! Problem of the Day
//!
//! The problem is chosen deterministically from the UTC day number, so every
//! process picks the same question for the same day without coordination.
//! The daily mailing job is shared by `POST /api/potd/send` and the worker;
//! a `job_runs` row makes it run at most once per UTC day.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use crate::catalog::questions::{Question, QuestionCatalog};
use crate::mail::{templates, Mailer};
use crate::models::job_run::{date_key, JobRun};
use crate::models::user::User;

/// `job_runs.job_name` of the daily mailing
pub const POTD_JOB_NAME: &str = "send-potd";

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Errors of the daily job
#[derive(Debug, thiserror::Error)]
pub enum PotdError {
    #[error("Question catalog is empty")]
    NoQuestions,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Outcome of one run of the daily job
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyJobReport {
    pub date_key: String,
    pub already_sent: bool,
    pub problem: Option<String>,
    pub sent: usize,
    pub failed: usize,
}

/// Days since the Unix epoch
pub fn day_id(now: DateTime<Utc>) -> i64 {
    now.timestamp_millis().div_euclid(MILLIS_PER_DAY)
}

/// `floor(frac(sin(day_id) * 10000) * len)`; None for an empty list
pub fn select_index(day_id: i64, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }

    let x = (day_id as f64).sin() * 10000.0;
    let fraction = x - x.floor();
    let index = (fraction * len as f64).floor() as usize;
    Some(index.min(len - 1))
}

/// Today's problem from the flattened catalog
pub fn problem_of_the_day(catalog: &QuestionCatalog, now: DateTime<Utc>) -> Option<&Question> {
    let questions = catalog.all_questions();
    select_index(day_id(now), questions.len()).map(|i| questions[i])
}

/// Mails today's problem to every subscriber, once per UTC day
///
/// Returns a report with `already_sent` set when the day was claimed
/// before. Failures for single recipients are logged and counted; only
/// database errors abort the run, and they release the day's claim so the
/// job can be retried.
pub async fn run_daily_job(
    pool: &PgPool,
    mailer: &dyn Mailer,
    catalog: &QuestionCatalog,
    base_url: &str,
    now: DateTime<Utc>,
) -> Result<DailyJobReport, PotdError> {
    let key = date_key(now);
    let problem = problem_of_the_day(catalog, now).ok_or(PotdError::NoQuestions)?;

    if JobRun::try_claim(pool, POTD_JOB_NAME, &key).await?.is_none() {
        tracing::info!(date_key = %key, "POTD already sent today");
        return Ok(DailyJobReport {
            date_key: key,
            already_sent: true,
            problem: Some(problem.title.clone()),
            ..Default::default()
        });
    }

    let subscribers = match User::list_email_subscribers(pool).await {
        Ok(subscribers) => subscribers,
        Err(e) => {
            if let Err(release_err) = JobRun::release(pool, POTD_JOB_NAME, &key).await {
                tracing::error!(error = %release_err, date_key = %key, "Failed to release POTD claim");
            }
            return Err(e.into());
        }
    };

    tracing::info!(
        date_key = %key,
        problem = %problem.title,
        recipients = subscribers.len(),
        mailer = mailer.name(),
        "Sending POTD"
    );

    let mut report = DailyJobReport {
        date_key: key,
        problem: Some(problem.title.clone()),
        ..Default::default()
    };

    for subscriber in subscribers {
        let email = templates::potd_email(&subscriber.email, problem, base_url);
        match mailer.send(&email).await {
            Ok(()) => report.sent += 1,
            Err(e) => {
                tracing::warn!(user_id = %subscriber.id, error = %e, "Failed to send POTD");
                report.failed += 1;
            }
        }
    }

    tracing::info!(sent = report.sent, failed = report.failed, "POTD run finished");

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_day_id() {
        let at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(day_id(at), 20454);
        let late = Utc.with_ymd_and_hms(2026, 1, 1, 23, 59, 59).unwrap();
        assert_eq!(day_id(late), 20454);
    }

    #[test]
    fn test_select_index_known_days() {
        assert_eq!(select_index(0, 104), Some(0));
        assert_eq!(select_index(1, 104), Some(73));
        assert_eq!(select_index(20000, 104), Some(88));
        assert_eq!(select_index(20454, 104), Some(63));
        assert_eq!(select_index(20454, 7), Some(4));
    }

    #[test]
    fn test_select_index_bounds() {
        assert_eq!(select_index(5, 0), None);
        for day in 19000..19400 {
            let index = select_index(day, 13).unwrap();
            assert!(index < 13);
        }
    }

    #[test]
    fn test_problem_of_the_day_is_stable_within_a_day() {
        let catalog = QuestionCatalog::bundled().unwrap();
        let morning = Utc.with_ymd_and_hms(2026, 1, 1, 1, 0, 0).unwrap();
        let evening = Utc.with_ymd_and_hms(2026, 1, 1, 22, 0, 0).unwrap();

        let a = problem_of_the_day(&catalog, morning).unwrap();
        let b = problem_of_the_day(&catalog, evening).unwrap();
        assert_eq!(a.title, b.title);

        let all = catalog.all_questions();
        assert!(std::ptr::eq(a, all[63]));
    }
}
