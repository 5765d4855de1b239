/// Badge endpoints
///
/// # Endpoints
///
/// - `POST /api/badges` (session)
/// - `GET  /api/badges/:user_id`

use crate::{
    app::AppState,
    error::ApiResult,
    routes::{ensure_self, parse_user_id, present},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use dsamate_shared::{
    auth::middleware::AuthContext,
    gamification,
    models::{
        badge::{Badge, BadgeSet},
        progress::Progress,
    },
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwardBadgesRequest {
    pub user_id: Option<String>,
    pub badge_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AwardBadgesResponse {
    pub message: String,
    pub badges: Vec<Badge>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgesResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub badges: Vec<Badge>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Award every completed topic plus an optional named badge
///
/// Badges already held are skipped.
pub async fn award_badges(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<AwardBadgesRequest>,
) -> ApiResult<Json<AwardBadgesResponse>> {
    let user_id = ensure_self(&auth, req.user_id.as_deref())?;

    let mut candidates = Progress::find_by_user(&state.db, user_id)
        .await?
        .map(|p| p.topics_completed)
        .unwrap_or_default();
    if let Some(name) = present(&req.badge_name) {
        candidates.push(name.to_string());
    }

    let held = BadgeSet::badges_of(&state.db, user_id).await?;
    let fresh = gamification::new_badges(&held, candidates, Utc::now());

    if fresh.is_empty() {
        return Ok(Json(AwardBadgesResponse {
            message: "No new badges to award".to_string(),
            badges: held,
        }));
    }

    let set = BadgeSet::append(&state.db, user_id, &fresh).await?;
    tracing::info!(user_id = %user_id, count = fresh.len(), "Badges awarded");

    Ok(Json(AwardBadgesResponse {
        message: "Badges awarded successfully".to_string(),
        badges: set.badges.0,
    }))
}

/// Badges of a user with the time of the last award
///
/// Responds 404 with an empty list when the user never earned a badge.
pub async fn get_badges(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Response> {
    let user_id = parse_user_id(&user_id)?;

    let response = match BadgeSet::find_by_user(&state.db, user_id).await? {
        Some(set) => Json(BadgesResponse {
            message: None,
            badges: set.badges.0,
            updated_at: Some(set.updated_at),
        })
        .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(BadgesResponse {
                message: Some("No badges found for this user".to_string()),
                badges: Vec::new(),
                updated_at: None,
            }),
        )
            .into_response(),
    };

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_badges_body() {
        let body = serde_json::to_value(BadgesResponse {
            message: Some("No badges found for this user".to_string()),
            badges: Vec::new(),
            updated_at: None,
        })
        .unwrap();

        assert_eq!(body["badges"], serde_json::json!([]));
        assert!(body["updatedAt"].is_null());
    }

    #[test]
    fn test_found_badges_body_has_no_message() {
        let body = serde_json::to_value(BadgesResponse {
            message: None,
            badges: vec![Badge {
                name: "Arrays".to_string(),
                claimed_at: Utc::now(),
            }],
            updated_at: Some(Utc::now()),
        })
        .unwrap();

        assert!(body.get("message").is_none());
        assert_eq!(body["badges"][0]["name"], "Arrays");
        assert!(body["updatedAt"].is_string());
    }
}
