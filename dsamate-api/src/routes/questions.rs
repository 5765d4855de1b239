/// Practice-sheet question catalog
///
/// # Endpoint
///
/// `GET /api/questions?topicId=&difficulty=&company=`

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Query, State},
    Json,
};
use dsamate_shared::catalog::questions::{QuestionFilter, Topic};
use serde::Serialize;

/// Either every topic or the single requested one
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum QuestionData {
    Topics(Vec<Topic>),
    Topic(Topic),
}

#[derive(Debug, Serialize)]
pub struct QuestionsResponse {
    pub success: bool,
    pub data: QuestionData,
}

/// Topics with their questions narrowed by difficulty and company
///
/// With `topicId` only that topic is returned, or 404 when it is unknown.
pub async fn list_questions(
    State(state): State<AppState>,
    Query(filter): Query<QuestionFilter>,
) -> ApiResult<Json<QuestionsResponse>> {
    let mut topics = state.questions.filter(&filter);

    let data = match filter.topic_id {
        Some(id) => QuestionData::Topic(
            topics
                .pop()
                .ok_or_else(|| ApiError::NotFound(format!("Topic {} not found", id)))?,
        ),
        None => QuestionData::Topics(topics),
    };

    Ok(Json(QuestionsResponse {
        success: true,
        data,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_topic_serializes_as_object() {
        let body = serde_json::to_value(QuestionsResponse {
            success: true,
            data: QuestionData::Topic(Topic {
                id: 3,
                name: "Strings".to_string(),
                questions: Vec::new(),
            }),
        })
        .unwrap();

        assert_eq!(body["data"]["id"], 3);
        assert_eq!(body["data"]["name"], "Strings");
    }

    #[test]
    fn test_topic_list_serializes_as_array() {
        let body = serde_json::to_value(QuestionsResponse {
            success: true,
            data: QuestionData::Topics(Vec::new()),
        })
        .unwrap();

        assert_eq!(body["data"], serde_json::json!([]));
    }
}
