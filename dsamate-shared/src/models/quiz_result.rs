/// Quiz attempts
///
/// # Schema
///
/// ```sql
/// CREATE TABLE quiz_results (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     quiz_id VARCHAR(255) NOT NULL,
///     score INTEGER NOT NULL,
///     total_questions INTEGER NOT NULL,
///     correct_answers INTEGER NOT NULL,   -- <= total_questions
///     quiz_type VARCHAR(16) NOT NULL DEFAULT 'MCQ',
///     taken_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Kind of quiz
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuizType {
    #[default]
    #[serde(rename = "MCQ")]
    Mcq,
    Coding,
    TrueFalse,
    Other,
}

impl QuizType {
    /// Converts quiz type to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            QuizType::Mcq => "MCQ",
            QuizType::Coding => "Coding",
            QuizType::TrueFalse => "TrueFalse",
            QuizType::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    pub id: Uuid,
    pub user_id: Uuid,
    pub quiz_id: String,
    pub score: i32,
    pub total_questions: i32,
    pub correct_answers: i32,
    pub quiz_type: String,
    pub taken_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateQuizResult {
    pub user_id: Uuid,
    pub quiz_id: String,
    pub score: i32,
    pub total_questions: i32,
    pub correct_answers: i32,
    pub quiz_type: QuizType,
}

/// Aggregate over a user's attempts
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizStats {
    pub avg_score: f64,
    pub total_quizzes: usize,
}

impl QuizStats {
    /// Mean score over `results`; zeros when there are none
    pub fn from_results(results: &[QuizResult]) -> Self {
        if results.is_empty() {
            return Self {
                avg_score: 0.0,
                total_quizzes: 0,
            };
        }

        let sum: i64 = results.iter().map(|r| r.score as i64).sum();
        Self {
            avg_score: sum as f64 / results.len() as f64,
            total_quizzes: results.len(),
        }
    }
}

impl QuizResult {
    pub async fn create(pool: &PgPool, data: &CreateQuizResult) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, QuizResult>(
            r#"
            INSERT INTO quiz_results
                (user_id, quiz_id, score, total_questions, correct_answers, quiz_type)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(data.user_id)
        .bind(&data.quiz_id)
        .bind(data.score)
        .bind(data.total_questions)
        .bind(data.correct_answers)
        .bind(data.quiz_type.as_str())
        .fetch_one(pool)
        .await
    }

    /// A user's attempts, newest first; `limit` of None returns all
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: Uuid,
        limit: Option<i64>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, QuizResult>(
            r#"
            SELECT * FROM quiz_results
            WHERE user_id = $1
            ORDER BY taken_at DESC, id
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await
    }
}
