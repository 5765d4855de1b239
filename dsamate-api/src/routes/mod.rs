/// API route handlers
///
/// Handlers are organized by resource:
///
/// - `health`: health check
/// - `auth`: credentials sign-up/sign-in, OTP, password reset, session
/// - `oauth`: Google and GitHub sign-in
/// - `progress`, `badges`: practice-sheet progress and badges
/// - `roadmaps`: learning paths and per-topic progress
/// - `quiz_results`, `testimonials`, `interview_experiences`
/// - `email_preference`, `avatar`: account preferences
/// - `questions`, `potd`: question catalog and Problem of the Day
/// - `contributors`: contributor leaderboard

pub mod auth;
pub mod avatar;
pub mod badges;
pub mod contributors;
pub mod email_preference;
pub mod health;
pub mod interview_experiences;
pub mod oauth;
pub mod potd;
pub mod progress;
pub mod questions;
pub mod quiz_results;
pub mod roadmaps;
pub mod testimonials;

use serde::Serialize;
use uuid::Uuid;

use crate::error::ApiError;
use dsamate_shared::auth::middleware::AuthContext;

/// `{ "success": true, "message": ... }`
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Trimmed value when present and non-empty
pub(crate) fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Rejects a body `userId` naming someone other than the session user
pub(crate) fn ensure_self(auth: &AuthContext, claimed: Option<&str>) -> Result<Uuid, ApiError> {
    match claimed.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(auth.user_id),
        Some(raw) => match Uuid::parse_str(raw) {
            Ok(id) if id == auth.user_id => Ok(id),
            _ => Err(ApiError::Forbidden(
                "Cannot act on behalf of another user".to_string(),
            )),
        },
    }
}

/// Parses a path user id, 404 when it cannot name any user
pub(crate) fn parse_user_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::NotFound("User not found".to_string()))
}
