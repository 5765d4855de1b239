/// Problem of the Day endpoints
///
/// # Endpoints
///
/// - `GET  /api/potd`
/// - `POST /api/potd/send` (header `X-Cron-Secret`)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::State, http::HeaderMap, Json};
use chrono::{DateTime, Utc};
use dsamate_shared::{
    auth::otp::constant_time_eq,
    catalog::questions::Question,
    potd::{self, DailyJobReport},
};
use serde::Serialize;

/// Header carrying the scheduler's shared secret
pub const CRON_SECRET_HEADER: &str = "x-cron-secret";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PotdResponse {
    pub success: bool,
    pub date: DateTime<Utc>,
    pub problem: Question,
}

/// Checks the cron secret header
///
/// Without a configured secret the endpoint stays closed.
fn authorize_cron(configured: Option<&str>, headers: &HeaderMap) -> ApiResult<()> {
    let Some(expected) = configured.filter(|s| !s.is_empty()) else {
        return Err(ApiError::Forbidden(
            "POTD sending is not enabled".to_string(),
        ));
    };

    let provided = headers
        .get(CRON_SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing cron secret".to_string()))?;

    if !constant_time_eq(provided.as_bytes(), expected.as_bytes()) {
        return Err(ApiError::Forbidden("Invalid cron secret".to_string()));
    }
    Ok(())
}

/// Today's problem
pub async fn get_potd(State(state): State<AppState>) -> ApiResult<Json<PotdResponse>> {
    let now = Utc::now();
    let problem = potd::problem_of_the_day(&state.questions, now)
        .cloned()
        .ok_or_else(|| ApiError::NotFound("No questions available".to_string()))?;

    Ok(Json(PotdResponse {
        success: true,
        date: now,
        problem,
    }))
}

/// Run the daily mailing job
///
/// A second call on the same UTC day returns `alreadySent: true` without
/// mailing anyone.
///
/// # Errors
///
/// - `401 Unauthorized`: header missing
/// - `403 Forbidden`: wrong secret, or no secret configured
pub async fn send_potd(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<DailyJobReport>> {
    authorize_cron(state.config.cron_secret.as_deref(), &headers)?;

    let report = potd::run_daily_job(
        &state.db,
        state.mailer.as_ref(),
        &state.questions,
        &state.config.api.public_base_url,
        Utc::now(),
    )
    .await?;

    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(secret: Option<&'static str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(secret) = secret {
            headers.insert(CRON_SECRET_HEADER, HeaderValue::from_static(secret));
        }
        headers
    }

    #[test]
    fn test_cron_secret_accepted() {
        assert!(authorize_cron(Some("s3cret"), &headers(Some("s3cret"))).is_ok());
    }

    #[test]
    fn test_cron_secret_missing_header() {
        assert!(matches!(
            authorize_cron(Some("s3cret"), &headers(None)),
            Err(ApiError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_cron_secret_wrong() {
        assert!(matches!(
            authorize_cron(Some("s3cret"), &headers(Some("guess"))),
            Err(ApiError::Forbidden(_))
        ));
    }

    #[test]
    fn test_closed_without_configured_secret() {
        for configured in [None, Some("")] {
            assert!(matches!(
                authorize_cron(configured, &headers(Some("anything"))),
                Err(ApiError::Forbidden(_))
            ));
        }
    }
}
