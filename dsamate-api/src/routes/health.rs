/// Health check endpoint
///
/// Reports database connectivity plus the backends the process picked at
/// startup.
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "database": "connected",
///   "rateLimiter": "memory",
///   "mailer": "log",
///   "questions": 104
/// }
/// ```

use crate::app::AppState;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// `healthy`, or `degraded` when the database is unreachable
    pub status: String,
    pub version: String,
    pub database: String,
    /// `memory` or `redis`
    pub rate_limiter: String,
    pub mailer: String,
    /// Questions in the bundled catalog
    pub questions: usize,
}

/// Health check handler
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database_ok = sqlx::query("SELECT 1").fetch_one(&state.db).await.is_ok();
    if !database_ok {
        tracing::warn!("Health check could not reach the database");
    }

    Json(HealthResponse {
        status: if database_ok { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: if database_ok { "connected" } else { "disconnected" }.to_string(),
        rate_limiter: state.limiter.backend().to_string(),
        mailer: state.mailer.name().to_string(),
        questions: state.questions.all_questions().len(),
    })
}
