/// Practice-sheet progress endpoints
///
/// # Endpoints
///
/// - `POST /api/progress/update` (session)
/// - `GET  /api/progress/:user_id`

use crate::{
    app::AppState,
    error::ApiResult,
    routes::{ensure_self, parse_user_id, present},
};
use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use dsamate_shared::{
    auth::middleware::AuthContext,
    gamification::{self, Difficulty, ProgressUpdate},
    models::{
        badge::{Badge, BadgeSet},
        progress::{Progress, ProgressSummary},
    },
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Progress update request
///
/// `questionId` may arrive as a number or a string.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProgressRequest {
    pub user_id: Option<String>,
    pub question_difficulty: Option<String>,
    pub question_id: Option<Value>,
    #[serde(default)]
    pub is_solved: bool,
    pub topic_name: Option<String>,
    pub topic_completed: Option<String>,
}

impl UpdateProgressRequest {
    fn to_update(&self) -> ProgressUpdate {
        let question_id = match &self.question_id {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };

        ProgressUpdate {
            question_difficulty: self.question_difficulty.as_deref().and_then(Difficulty::parse),
            question_id,
            is_solved: self.is_solved,
            topic_name: present(&self.topic_name).map(str::to_string),
            topic_completed: present(&self.topic_completed).map(str::to_string),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UpdateProgressResponse {
    pub message: String,
    pub progress: ProgressSummary,
    pub badges: Vec<Badge>,
}

#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    pub progress: ProgressSummary,
    pub badges: Vec<Badge>,
}

/// Apply a solve/un-solve event and award any newly earned badges
///
/// # Errors
///
/// - `401 Unauthorized`: no session
/// - `403 Forbidden`: body `userId` is another user
pub async fn update_progress(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<UpdateProgressRequest>,
) -> ApiResult<Json<UpdateProgressResponse>> {
    let user_id = ensure_self(&auth, req.user_id.as_deref())?;
    let now = Utc::now();

    let mut progress = Progress::find_or_create(&state.db, user_id).await?;
    gamification::apply_progress_update(&mut progress, &req.to_update(), now);
    let progress = progress.save(&state.db).await?;

    let held = BadgeSet::badges_of(&state.db, user_id).await?;
    let fresh = gamification::new_badges(&held, gamification::eligible_badges(&progress), now);

    let badges = if fresh.is_empty() {
        held
    } else {
        tracing::info!(
            user_id = %user_id,
            count = fresh.len(),
            "Badges awarded"
        );
        BadgeSet::append(&state.db, user_id, &fresh).await?.badges.0
    };

    Ok(Json(UpdateProgressResponse {
        message: "Progress updated".to_string(),
        progress: progress.summary(),
        badges,
    }))
}

/// Public progress summary of a user
///
/// Users without a progress row get the all-zero summary.
pub async fn get_progress(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<ProgressResponse>> {
    let user_id = parse_user_id(&user_id)?;

    let progress = Progress::find_by_user(&state.db, user_id)
        .await?
        .unwrap_or_else(|| Progress::empty(user_id));
    let badges = BadgeSet::badges_of(&state.db, user_id).await?;

    Ok(Json(ProgressResponse {
        progress: progress.summary(),
        badges,
    }))
}
