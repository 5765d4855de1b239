/// Daily Problem of the Day scheduler
///
/// Sleeps until the configured UTC hour, then runs the shared daily job.
/// The job claims the day in `job_runs`, so several workers (or a worker
/// plus a cron call to `POST /api/potd/send`) still mail each subscriber at
/// most once per day.
///
/// # Schedule
///
/// ```text
/// startup ──(past send hour today?)──> run now
///    │
///    └─> sleep until next send hour ─> run ─> sleep ...
/// ```
///
/// A failed run is retried every `retry_secs` until it succeeds or the UTC
/// day ends.
///
/// # Example
///
/// ```no_run
/// use dsamate_worker::config::ScheduleConfig;
/// use dsamate_worker::scheduler::PotdScheduler;
/// use dsamate_shared::catalog::questions::QuestionCatalog;
/// use dsamate_shared::mail::LogMailer;
/// use std::sync::Arc;
///
/// # async fn example(pool: sqlx::PgPool) -> anyhow::Result<()> {
/// let scheduler = PotdScheduler::new(
///     pool,
///     Arc::new(LogMailer::new("noreply@example.com")),
///     Arc::new(QuestionCatalog::bundled()?),
///     "http://localhost:3000",
///     ScheduleConfig::default(),
/// );
///
/// let token = scheduler.shutdown_token();
/// tokio::spawn(async move {
///     let _ = tokio::signal::ctrl_c().await;
///     token.cancel();
/// });
/// scheduler.run().await;
/// # Ok(())
/// # }
/// ```

use crate::config::ScheduleConfig;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Timelike, Utc};
use dsamate_shared::catalog::questions::QuestionCatalog;
use dsamate_shared::mail::Mailer;
use dsamate_shared::potd::{self, DailyJobReport, PotdError};
use sqlx::PgPool;
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;

/// Next instant at `send_hour` UTC strictly after `now`
pub fn next_run_after(now: DateTime<Utc>, send_hour: u32) -> DateTime<Utc> {
    let today = now
        .date_naive()
        .and_hms_opt(send_hour.min(23), 0, 0)
        .map(|naive| Utc.from_utc_datetime(&naive));

    match today {
        Some(at) if at > now => at,
        Some(at) => at + ChronoDuration::days(1),
        None => now + ChronoDuration::days(1),
    }
}

/// Whether today's send time has already passed at startup
pub fn due_at_startup(now: DateTime<Utc>, send_hour: u32) -> bool {
    now.hour() >= send_hour
}

/// Runs the POTD mailing once a day until shut down
pub struct PotdScheduler {
    db: PgPool,
    mailer: Arc<dyn Mailer>,
    catalog: Arc<QuestionCatalog>,
    public_base_url: String,
    schedule: ScheduleConfig,
    shutdown_token: CancellationToken,
}

impl PotdScheduler {
    pub fn new(
        db: PgPool,
        mailer: Arc<dyn Mailer>,
        catalog: Arc<QuestionCatalog>,
        public_base_url: impl Into<String>,
        schedule: ScheduleConfig,
    ) -> Self {
        Self {
            db,
            mailer,
            catalog,
            public_base_url: public_base_url.into(),
            schedule,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Used to signal graceful shutdown from external handlers
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// One run of the daily job at `now`
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<DailyJobReport, PotdError> {
        potd::run_daily_job(
            &self.db,
            self.mailer.as_ref(),
            &self.catalog,
            &self.public_base_url,
            now,
        )
        .await
    }

    /// Scheduler loop; returns once the shutdown token is cancelled
    pub async fn run(&self) {
        let hour = self.schedule.send_hour_utc;
        tracing::info!(
            send_hour_utc = hour,
            mailer = self.mailer.name(),
            "POTD scheduler starting"
        );

        if due_at_startup(Utc::now(), hour) {
            self.run_with_retry().await;
        }

        loop {
            let now = Utc::now();
            let next = next_run_after(now, hour);
            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
            tracing::debug!(next_run = %next, "Waiting for next POTD run");

            tokio::select! {
                _ = self.shutdown_token.cancelled() => break,
                _ = sleep(wait) => {}
            }

            self.run_with_retry().await;
        }

        tracing::info!("POTD scheduler shut down");
    }

    /// Runs the job, retrying failures for the rest of the UTC day
    async fn run_with_retry(&self) {
        let day = Utc::now().date_naive();

        while !self.shutdown_token.is_cancelled() {
            let now = Utc::now();
            if now.date_naive() != day {
                tracing::warn!(date = %day, "Giving up on POTD run for a past day");
                return;
            }

            match self.run_once(now).await {
                Ok(report) if report.already_sent => {
                    tracing::info!(date_key = %report.date_key, "POTD already handled today");
                    return;
                }
                Ok(report) => {
                    tracing::info!(
                        date_key = %report.date_key,
                        sent = report.sent,
                        failed = report.failed,
                        "POTD run complete"
                    );
                    return;
                }
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        retry_secs = self.schedule.retry_secs,
                        "POTD run failed"
                    );
                }
            }

            tokio::select! {
                _ = self.shutdown_token.cancelled() => return,
                _ = sleep(Duration::from_secs(self.schedule.retry_secs)) => {}
            }
        }
    }
}
