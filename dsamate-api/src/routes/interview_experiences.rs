/// Interview experience endpoints
///
/// # Endpoints
///
/// - `POST /api/interview-experiences`
/// - `GET  /api/interview-experiences`
/// - `GET  /api/interview-experiences/:id`

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
    routes::present,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use dsamate_shared::models::interview_experience::{
    CreateInterviewExperience, InterviewExperience,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const LEVELS: [&str; 3] = ["easy", "medium", "hard"];
const RESULTS: [&str; 2] = ["selected", "not selected"];

/// New interview experience
///
/// `roundes` is accepted as an alias of `rounds`.
#[derive(Debug, Deserialize)]
pub struct CreateExperienceRequest {
    pub company: Option<String>,
    pub position: Option<String>,
    pub author: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub content: Option<String>,
    #[serde(alias = "roundes")]
    pub rounds: Option<i32>,
    pub level: Option<String>,
    pub result: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ExperienceResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

fn invalid(field: &str, message: &str) -> ValidationErrorDetail {
    ValidationErrorDetail {
        field: field.to_string(),
        message: message.to_string(),
    }
}

impl CreateExperienceRequest {
    /// Collects every field problem instead of stopping at the first
    fn into_create(self) -> ApiResult<CreateInterviewExperience> {
        let mut errors = Vec::new();

        let mut required = |field: &str, value: &Option<String>| -> String {
            match present(value) {
                Some(v) => v.to_string(),
                None => {
                    errors.push(invalid(field, "is required"));
                    String::new()
                }
            }
        };

        let company = required("company", &self.company);
        let position = required("position", &self.position);
        let author = required("author", &self.author);
        let content = required("content", &self.content);
        let level = required("level", &self.level).to_ascii_lowercase();
        let result = required("result", &self.result).to_ascii_lowercase();

        match self.rounds {
            None => errors.push(invalid("rounds", "is required")),
            Some(n) if n < 1 => errors.push(invalid("rounds", "must be at least 1")),
            Some(_) => {}
        }
        if !level.is_empty() && !LEVELS.contains(&level.as_str()) {
            errors.push(invalid("level", "must be easy, medium or hard"));
        }
        if !result.is_empty() && !RESULTS.contains(&result.as_str()) {
            errors.push(invalid("result", "must be selected or not selected"));
        }

        if !errors.is_empty() {
            return Err(ApiError::ValidationError(errors));
        }

        Ok(CreateInterviewExperience {
            company,
            position,
            author,
            tags: self
                .tags
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
            content,
            rounds: self.rounds.unwrap_or(1),
            level,
            result,
        })
    }
}

/// Share an interview experience
pub async fn create_experience(
    State(state): State<AppState>,
    Json(req): Json<CreateExperienceRequest>,
) -> ApiResult<(StatusCode, Json<ExperienceResponse<InterviewExperience>>)> {
    let data = req.into_create()?;
    let experience = InterviewExperience::create(&state.db, &data).await?;

    tracing::info!(
        experience_id = %experience.id,
        company = %experience.company,
        "Interview experience shared"
    );

    Ok((
        StatusCode::CREATED,
        Json(ExperienceResponse {
            success: true,
            data: experience,
        }),
    ))
}

/// All experiences, newest first
pub async fn list_experiences(
    State(state): State<AppState>,
) -> ApiResult<Json<ExperienceResponse<Vec<InterviewExperience>>>> {
    Ok(Json(ExperienceResponse {
        success: true,
        data: InterviewExperience::list(&state.db).await?,
    }))
}

/// One experience by id
pub async fn get_experience(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ExperienceResponse<InterviewExperience>>> {
    let not_found = || ApiError::NotFound("Interview not found".to_string());

    let id = Uuid::parse_str(id.trim()).map_err(|_| not_found())?;
    let experience = InterviewExperience::find_by_id(&state.db, id)
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(ExperienceResponse {
        success: true,
        data: experience,
    }))
}
