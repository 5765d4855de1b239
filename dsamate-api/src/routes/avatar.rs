/// Avatar upload and removal
///
/// Images are stored inline on the user row as `data:` URLs.
///
/// # Endpoints
///
/// - `POST   /api/avatar` (session, multipart field `file`)
/// - `DELETE /api/avatar` (session)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    body::Bytes,
    extract::{Multipart, State},
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use dsamate_shared::{auth::middleware::AuthContext, models::user::User};
use serde::Serialize;

/// Largest accepted image
pub const MAX_AVATAR_BYTES: usize = 5 * 1024 * 1024;

const ALLOWED_TYPES: [&str; 4] = ["image/png", "image/jpeg", "image/jpg", "image/webp"];

#[derive(Debug, Serialize)]
pub struct AvatarResponse {
    pub avatar: Option<String>,
}

/// Encodes an upload as a `data:` URL after checking type and size
pub fn avatar_data_url(content_type: &str, bytes: &[u8]) -> ApiResult<String> {
    let mime = content_type.trim().to_ascii_lowercase();
    if !ALLOWED_TYPES.contains(&mime.as_str()) {
        return Err(ApiError::BadRequest("Unsupported file type".to_string()));
    }
    if bytes.len() > MAX_AVATAR_BYTES {
        return Err(ApiError::BadRequest("File too large (max 5 MB)".to_string()));
    }

    Ok(format!("data:{};base64,{}", mime, STANDARD.encode(bytes)))
}

/// Content type and bytes of the `file` field
///
/// A body over the router's size limit is a `413`.
pub(crate) async fn read_upload(mut multipart: Multipart) -> ApiResult<(String, Bytes)> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field.bytes().await?;
        return Ok((content_type, bytes));
    }

    Err(ApiError::BadRequest("No file uploaded".to_string()))
}

/// Upload or replace the session user's avatar
///
/// # Errors
///
/// - `400 Bad Request`: no `file` field, unsupported type, larger than 5 MiB
/// - `413 Payload Too Large`: request body over the router's limit
pub async fn upload_avatar(
    State(state): State<AppState>,
    auth: AuthContext,
    multipart: Multipart,
) -> ApiResult<Json<AvatarResponse>> {
    let (content_type, bytes) = read_upload(multipart).await?;
    let data_url = avatar_data_url(&content_type, &bytes)?;

    User::set_avatar(&state.db, auth.user_id, Some(&data_url))
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    tracing::info!(user_id = %auth.user_id, size = bytes.len(), "Avatar updated");

    Ok(Json(AvatarResponse {
        avatar: Some(data_url),
    }))
}

/// Remove the session user's avatar
pub async fn remove_avatar(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<AvatarResponse>> {
    User::set_avatar(&state.db, auth.user_id, None)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    tracing::info!(user_id = %auth.user_id, "Avatar removed");
    Ok(Json(AvatarResponse { avatar: None }))
}
