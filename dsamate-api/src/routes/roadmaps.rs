/// Roadmap endpoints
///
/// The curriculum is static; per-user progress lives in
/// `roadmap_progress` and the derived summary in `roadmap_user_stats`.
///
/// # Endpoints
///
/// - `GET  /api/roadmaps`
/// - `GET  /api/roadmaps/:roadmap_id`
/// - `GET  /api/roadmaps/:roadmap_id/progress` (session)
/// - `POST /api/roadmaps/:roadmap_id/progress` (session)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::present,
};
use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use dsamate_shared::{
    auth::middleware::AuthContext,
    catalog::roadmaps::Roadmap,
    models::roadmap_progress::{
        derive_stats, RoadmapProgress, RoadmapStatus, RoadmapUserStats, UpsertRoadmapProgress,
        MAX_NOTES_LENGTH,
    },
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct RoadmapListResponse {
    pub success: bool,
    pub roadmaps: Vec<Roadmap>,
}

#[derive(Debug, Serialize)]
pub struct RoadmapResponse {
    pub success: bool,
    pub roadmap: Roadmap,
}

#[derive(Debug, Serialize)]
pub struct RoadmapProgressResponse {
    pub success: bool,
    pub progress: Vec<RoadmapProgress>,
    pub stats: RoadmapUserStats,
    pub roadmap: Roadmap,
}

#[derive(Debug, Serialize)]
pub struct UpdateRoadmapProgressResponse {
    pub success: bool,
    pub progress: RoadmapProgress,
    pub stats: RoadmapUserStats,
}

/// Topic progress update
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRoadmapProgressRequest {
    pub topic_id: Option<String>,
    pub level_id: Option<String>,
    pub status: Option<String>,
    pub time_spent: Option<i32>,
    pub notes: Option<String>,
}

impl UpdateRoadmapProgressRequest {
    /// Checks the body against `roadmap`
    ///
    /// The stored level is always the catalog level that owns the topic.
    fn validate(&self, roadmap: &Roadmap) -> ApiResult<UpsertRoadmapProgress> {
        let (Some(topic_id), Some(_), Some(status)) = (
            present(&self.topic_id),
            present(&self.level_id),
            present(&self.status),
        ) else {
            return Err(ApiError::BadRequest("Missing required fields".to_string()));
        };

        let status = RoadmapStatus::parse(status)
            .ok_or_else(|| ApiError::BadRequest("Invalid status".to_string()))?;

        let notes = self.notes.clone().unwrap_or_default();
        if notes.chars().count() > MAX_NOTES_LENGTH {
            return Err(ApiError::BadRequest(format!(
                "Notes must be at most {} characters",
                MAX_NOTES_LENGTH
            )));
        }

        let time_spent = self.time_spent.unwrap_or(0);
        if time_spent < 0 {
            return Err(ApiError::BadRequest(
                "timeSpent must not be negative".to_string(),
            ));
        }

        let level = roadmap.level_of(topic_id).ok_or_else(|| {
            ApiError::NotFound("Topic not found in this roadmap".to_string())
        })?;

        Ok(UpsertRoadmapProgress {
            topic_id: topic_id.to_string(),
            level_id: level.id.clone(),
            status,
            time_spent,
            notes,
        })
    }
}

fn find_roadmap(state: &AppState, roadmap_id: &str) -> ApiResult<Roadmap> {
    state
        .roadmaps
        .get(roadmap_id)
        .cloned()
        .ok_or_else(|| ApiError::NotFound("Roadmap not found".to_string()))
}

/// List every roadmap
pub async fn list_roadmaps(State(state): State<AppState>) -> Json<RoadmapListResponse> {
    Json(RoadmapListResponse {
        success: true,
        roadmaps: state.roadmaps.all().to_vec(),
    })
}

/// Get one roadmap
pub async fn get_roadmap(
    State(state): State<AppState>,
    Path(roadmap_id): Path<String>,
) -> ApiResult<Json<RoadmapResponse>> {
    Ok(Json(RoadmapResponse {
        success: true,
        roadmap: find_roadmap(&state, &roadmap_id)?,
    }))
}

/// The session user's progress on a roadmap
///
/// Default stats are stored on first view.
pub async fn get_progress(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(roadmap_id): Path<String>,
) -> ApiResult<Json<RoadmapProgressResponse>> {
    let roadmap = find_roadmap(&state, &roadmap_id)?;

    let progress = RoadmapProgress::list(&state.db, auth.user_id, &roadmap.id).await?;
    let stats = RoadmapUserStats::find_or_create(&state.db, auth.user_id, &roadmap).await?;

    Ok(Json(RoadmapProgressResponse {
        success: true,
        progress,
        stats,
        roadmap,
    }))
}

/// Record progress on a topic and recompute the roadmap stats
///
/// # Errors
///
/// - `400 Bad Request`: missing fields, unknown status, notes too long
/// - `404 Not Found`: unknown roadmap or topic outside it
pub async fn update_progress(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(roadmap_id): Path<String>,
    Json(req): Json<UpdateRoadmapProgressRequest>,
) -> ApiResult<Json<UpdateRoadmapProgressResponse>> {
    let roadmap = find_roadmap(&state, &roadmap_id)?;
    let data = req.validate(&roadmap)?;

    let progress = RoadmapProgress::upsert(&state.db, auth.user_id, &roadmap.id, &data).await?;

    let rows = RoadmapProgress::list(&state.db, auth.user_id, &roadmap.id).await?;
    let previous = RoadmapUserStats::find(&state.db, auth.user_id, &roadmap.id).await?;
    let stats = derive_stats(&roadmap, &rows, previous.as_ref(), auth.user_id, Utc::now())
        .save(&state.db)
        .await?;

    tracing::debug!(
        user_id = %auth.user_id,
        roadmap_id = %roadmap.id,
        topic_id = %progress.topic_id,
        status = %progress.status,
        "Roadmap progress updated"
    );

    Ok(Json(UpdateRoadmapProgressResponse {
        success: true,
        progress,
        stats,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsamate_shared::catalog::roadmaps::RoadmapCatalog;

    fn roadmap() -> Roadmap {
        RoadmapCatalog::bundled().unwrap().all()[0].clone()
    }

    fn request(topic_id: &str, status: &str) -> UpdateRoadmapProgressRequest {
        UpdateRoadmapProgressRequest {
            topic_id: Some(topic_id.to_string()),
            level_id: Some("anything".to_string()),
            status: Some(status.to_string()),
            time_spent: Some(15),
            notes: None,
        }
    }

    #[test]
    fn test_valid_request_uses_catalog_level() {
        let roadmap = roadmap();
        let level = &roadmap.levels[0];
        let topic = &level.topics[0];

        let data = request(&topic.id, "completed").validate(&roadmap).unwrap();
        assert_eq!(data.level_id, level.id);
        assert_eq!(data.status, RoadmapStatus::Completed);
        assert_eq!(data.time_spent, 15);
        assert!(data.notes.is_empty());
    }

    #[test]
    fn test_missing_fields_rejected() {
        let roadmap = roadmap();
        let mut req = request(&roadmap.levels[0].topics[0].id, "completed");
        req.level_id = None;
        assert!(matches!(req.validate(&roadmap), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn test_unknown_status_rejected() {
        let roadmap = roadmap();
        let req = request(&roadmap.levels[0].topics[0].id, "done");
        assert!(matches!(req.validate(&roadmap), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn test_long_notes_rejected() {
        let roadmap = roadmap();
        let mut req = request(&roadmap.levels[0].topics[0].id, "in-progress");
        req.notes = Some("x".repeat(MAX_NOTES_LENGTH + 1));
        assert!(matches!(req.validate(&roadmap), Err(ApiError::BadRequest(_))));

        req.notes = Some("x".repeat(MAX_NOTES_LENGTH));
        assert!(req.validate(&roadmap).is_ok());
    }

    #[test]
    fn test_topic_outside_roadmap_is_not_found() {
        let roadmap = roadmap();
        let req = request("no-such-topic", "completed");
        assert!(matches!(req.validate(&roadmap), Err(ApiError::NotFound(_))));
    }
}
