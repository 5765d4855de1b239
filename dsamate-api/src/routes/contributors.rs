/// Contributor leaderboard
///
/// # Endpoint
///
/// `GET /api/contributors/points`

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Json};
use dsamate_shared::leaderboard::Leaderboard;

/// Points per contributor from labelled, merged pull requests
///
/// Served from an in-process cache; a miss fetches from GitHub.
pub async fn contributor_points(State(state): State<AppState>) -> ApiResult<Json<Leaderboard>> {
    let repo = state.config.leaderboard_repo();
    let board = state.leaderboard.get_or_fetch(&state.http, &repo).await?;

    tracing::debug!(
        owner = %repo.owner,
        repo = %repo.name,
        contributors = board.contributors.len(),
        "Leaderboard served"
    );

    Ok(Json(board))
}
