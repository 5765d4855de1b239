/// Idempotency markers for scheduled jobs
///
/// A job claims a UTC day by inserting `(job_name, date_key)`; the unique
/// key guarantees that only one claim per day succeeds, whichever process
/// (API endpoint or worker) gets there first.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct JobRun {
    pub id: Uuid,
    pub job_name: String,
    pub date_key: String,
    pub created_at: DateTime<Utc>,
}

/// `YYYY-MM-DD` of `at` in UTC
pub fn date_key(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}

impl JobRun {
    /// Claims `(job_name, date_key)`
    ///
    /// Returns `Ok(None)` when the job already ran for that day.
    pub async fn try_claim(
        pool: &PgPool,
        job_name: &str,
        date_key: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, JobRun>(
            r#"
            INSERT INTO job_runs (job_name, date_key)
            VALUES ($1, $2)
            ON CONFLICT (job_name, date_key) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(job_name)
        .bind(date_key)
        .fetch_optional(pool)
        .await
    }

    /// Releases a claim so the job can be retried the same day
    pub async fn release(pool: &PgPool, job_name: &str, date_key: &str) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM job_runs WHERE job_name = $1 AND date_key = $2")
            .bind(job_name)
            .bind(date_key)
            .execute(pool)
            .await?;
        Ok(())
    }
}
