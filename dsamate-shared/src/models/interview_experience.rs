/// Shared interview experiences

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct InterviewExperience {
    pub id: Uuid,
    pub company: String,
    pub position: String,
    pub author: String,
    pub tags: Vec<String>,
    pub content: String,
    pub rounds: i32,
    /// `easy`, `medium` or `hard`
    pub level: String,
    /// `selected` or `not selected`
    pub result: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateInterviewExperience {
    pub company: String,
    pub position: String,
    pub author: String,
    pub tags: Vec<String>,
    pub content: String,
    pub rounds: i32,
    pub level: String,
    pub result: String,
}

impl InterviewExperience {
    pub async fn create(
        pool: &PgPool,
        data: &CreateInterviewExperience,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, InterviewExperience>(
            r#"
            INSERT INTO interview_experiences
                (company, position, author, tags, content, rounds, level, result)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(&data.company)
        .bind(&data.position)
        .bind(&data.author)
        .bind(&data.tags)
        .bind(&data.content)
        .bind(data.rounds)
        .bind(&data.level)
        .bind(&data.result)
        .fetch_one(pool)
        .await
    }

    /// All experiences, newest first
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, InterviewExperience>(
            "SELECT * FROM interview_experiences ORDER BY created_at DESC",
        )
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, InterviewExperience>(
            "SELECT * FROM interview_experiences WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }
}
