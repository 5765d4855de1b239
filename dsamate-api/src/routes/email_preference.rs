/// E-mail preference links from the daily mail
///
/// # Endpoint
///
/// `GET /api/email-preference?email=..&action=unsubscribe|newsletter`

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{present, MessageResponse},
};
use axum::{
    extract::{Query, State},
    Json,
};
use dsamate_shared::models::user::User;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct PreferenceQuery {
    pub email: Option<String>,
    pub action: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferenceAction {
    Unsubscribe,
    Newsletter,
}

impl PreferenceAction {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "unsubscribe" => Some(PreferenceAction::Unsubscribe),
            "newsletter" => Some(PreferenceAction::Newsletter),
            _ => None,
        }
    }
}

/// Apply an unsubscribe or newsletter opt-in
///
/// # Errors
///
/// - `400 Bad Request`: missing e-mail or action, unknown action
/// - `404 Not Found`: no account with that e-mail
pub async fn update_preference(
    State(state): State<AppState>,
    Query(query): Query<PreferenceQuery>,
) -> ApiResult<Json<MessageResponse>> {
    let (Some(email), Some(action)) = (present(&query.email), present(&query.action)) else {
        return Err(ApiError::BadRequest("Missing email or action.".to_string()));
    };

    let action = PreferenceAction::parse(action)
        .ok_or_else(|| ApiError::BadRequest("Invalid action.".to_string()))?;

    let (updated, message) = match action {
        PreferenceAction::Unsubscribe => (
            User::unsubscribe_emails(&state.db, email).await?,
            "You have been unsubscribed from emails.",
        ),
        PreferenceAction::Newsletter => (
            User::subscribe_newsletter(&state.db, email).await?,
            "You have been subscribed to the newsletter.",
        ),
    };

    if !updated {
        return Err(ApiError::NotFound("User not found.".to_string()));
    }

    tracing::info!(action = ?action, "E-mail preference updated");
    Ok(Json(MessageResponse::ok(message)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_action() {
        assert_eq!(
            PreferenceAction::parse("unsubscribe"),
            Some(PreferenceAction::Unsubscribe)
        );
        assert_eq!(
            PreferenceAction::parse("newsletter"),
            Some(PreferenceAction::Newsletter)
        );
        assert_eq!(PreferenceAction::parse("Unsubscribe"), None);
        assert_eq!(PreferenceAction::parse("spam"), None);
    }
}
