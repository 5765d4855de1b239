/// Quiz result endpoints
///
/// # Endpoints
///
/// - `POST /api/quiz-results` (session)
/// - `GET  /api/quiz-results/:user_id`
/// - `GET  /api/quiz-results/:user_id/recent`
/// - `GET  /api/quiz-results/:user_id/stats`

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{ensure_self, parse_user_id, present},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use dsamate_shared::{
    auth::middleware::AuthContext,
    models::quiz_result::{CreateQuizResult, QuizResult, QuizStats, QuizType},
};
use serde::{Deserialize, Serialize};

/// Attempts returned by the recent endpoint
const RECENT_LIMIT: i64 = 5;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuizResultRequest {
    pub user_id: Option<String>,
    pub quiz_id: Option<String>,
    pub score: Option<i32>,
    pub total_questions: Option<i32>,
    pub correct_answers: Option<i32>,
    #[serde(default)]
    pub quiz_type: QuizType,
}

#[derive(Debug, Serialize)]
pub struct CreateQuizResultResponse {
    pub message: String,
    pub result: QuizResult,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizStatsResponse {
    #[serde(flatten)]
    pub stats: QuizStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<QuizResult>>,
}

impl CreateQuizResultRequest {
    fn into_create(self, auth: &AuthContext) -> ApiResult<CreateQuizResult> {
        let user_id = ensure_self(auth, self.user_id.as_deref())?;

        let (Some(quiz_id), Some(score), Some(total_questions), Some(correct_answers)) = (
            present(&self.quiz_id).map(str::to_string),
            self.score,
            self.total_questions,
            self.correct_answers,
        ) else {
            return Err(ApiError::BadRequest(
                "quizId, score, totalQuestions and correctAnswers are required".to_string(),
            ));
        };

        if score < 0 || total_questions < 0 || correct_answers < 0 {
            return Err(ApiError::BadRequest(
                "Quiz values must not be negative".to_string(),
            ));
        }
        if correct_answers > total_questions {
            return Err(ApiError::BadRequest(
                "correctAnswers cannot exceed totalQuestions".to_string(),
            ));
        }

        Ok(CreateQuizResult {
            user_id,
            quiz_id,
            score,
            total_questions,
            correct_answers,
            quiz_type: self.quiz_type,
        })
    }
}

/// Record a quiz attempt for the session user
pub async fn create_result(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<CreateQuizResultRequest>,
) -> ApiResult<(StatusCode, Json<CreateQuizResultResponse>)> {
    let data = req.into_create(&auth)?;
    let result = QuizResult::create(&state.db, &data).await?;

    tracing::debug!(
        user_id = %result.user_id,
        quiz_id = %result.quiz_id,
        score = result.score,
        "Quiz result saved"
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateQuizResultResponse {
            message: "Result saved".to_string(),
            result,
        }),
    ))
}

/// Every attempt of a user, newest first
pub async fn list_results(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Vec<QuizResult>>> {
    let user_id = parse_user_id(&user_id)?;
    Ok(Json(QuizResult::list_for_user(&state.db, user_id, None).await?))
}

/// The five newest attempts of a user
pub async fn recent_results(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Vec<QuizResult>>> {
    let user_id = parse_user_id(&user_id)?;
    Ok(Json(
        QuizResult::list_for_user(&state.db, user_id, Some(RECENT_LIMIT)).await?,
    ))
}

/// Average score and attempt count, with the full history
pub async fn result_stats(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<QuizStatsResponse>> {
    let user_id = parse_user_id(&user_id)?;
    let results = QuizResult::list_for_user(&state.db, user_id, None).await?;

    let stats = QuizStats::from_results(&results);
    let history = (!results.is_empty()).then_some(results);

    Ok(Json(QuizStatsResponse { stats, history }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn auth() -> AuthContext {
        AuthContext {
            user_id: Uuid::new_v4(),
            email: "ada@example.com".to_string(),
        }
    }

    fn request(json: serde_json::Value) -> CreateQuizResultRequest {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_valid_request() {
        let auth = auth();
        let data = request(serde_json::json!({
            "quizId": "arrays-1",
            "score": 80,
            "totalQuestions": 10,
            "correctAnswers": 8,
            "quizType": "Coding"
        }))
        .into_create(&auth)
        .unwrap();

        assert_eq!(data.user_id, auth.user_id);
        assert_eq!(data.quiz_type, QuizType::Coding);
    }

    #[test]
    fn test_quiz_type_defaults_to_mcq() {
        let req = request(serde_json::json!({
            "quizId": "q",
            "score": 1,
            "totalQuestions": 1,
            "correctAnswers": 1
        }));
        assert_eq!(req.quiz_type, QuizType::Mcq);
    }

    #[test]
    fn test_more_correct_than_total_rejected() {
        let result = request(serde_json::json!({
            "quizId": "q",
            "score": 10,
            "totalQuestions": 3,
            "correctAnswers": 4
        }))
        .into_create(&auth());
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn test_negative_values_rejected() {
        let result = request(serde_json::json!({
            "quizId": "q",
            "score": -1,
            "totalQuestions": 3,
            "correctAnswers": 1
        }))
        .into_create(&auth());
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn test_missing_fields_rejected() {
        let result = request(serde_json::json!({"quizId": "q"})).into_create(&auth());
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn test_empty_stats_body() {
        let body = serde_json::to_value(QuizStatsResponse {
            stats: QuizStats::from_results(&[]),
            history: None,
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"avgScore": 0.0, "totalQuizzes": 0}));
    }
}
