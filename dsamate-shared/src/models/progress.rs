/// Practice-sheet progress, one row per user
///
/// The row is read, mutated in memory by
/// [`crate::gamification::apply_progress_update`] and written back whole.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE progress (
///     user_id UUID PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
///     last_visited TIMESTAMPTZ,
///     streak_count INTEGER NOT NULL DEFAULT 0,
///     easy_solved INTEGER NOT NULL DEFAULT 0,
///     medium_solved INTEGER NOT NULL DEFAULT 0,
///     hard_solved INTEGER NOT NULL DEFAULT 0,
///     total_solved INTEGER NOT NULL DEFAULT 0,
///     topics_progress JSONB NOT NULL DEFAULT '[]',
///     topics_completed TEXT[] NOT NULL DEFAULT '{}',
///     marked_for_revision INTEGER NOT NULL DEFAULT 0,
///     solved_questions TEXT[] NOT NULL DEFAULT '{}',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

/// Per-topic counter inside `topics_progress`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicProgress {
    pub topic_name: String,
    pub solved_count: i32,
    /// Questions needed to complete the topic; 0 means the default of 5
    #[serde(default)]
    pub total_questions: i32,
    #[serde(default)]
    pub marked_for_revision: i32,
}

/// Progress row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub user_id: Uuid,
    pub last_visited: Option<DateTime<Utc>>,
    pub streak_count: i32,
    pub easy_solved: i32,
    pub medium_solved: i32,
    pub hard_solved: i32,
    pub total_solved: i32,
    pub topics_progress: Json<Vec<TopicProgress>>,
    pub topics_completed: Vec<String>,
    pub marked_for_revision: i32,
    /// Question ids currently counted as solved
    #[serde(skip)]
    pub solved_questions: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public projection returned by `GET /api/progress/:userId`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSummary {
    pub easy_solved: i32,
    pub medium_solved: i32,
    pub hard_solved: i32,
    pub total_solved: i32,
    pub streak_count: i32,
    pub topics_progress: Vec<TopicProgress>,
    pub last_visited: Option<DateTime<Utc>>,
}

impl Progress {
    /// Fresh, never-saved progress for `user_id`
    pub fn empty(user_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            last_visited: None,
            streak_count: 0,
            easy_solved: 0,
            medium_solved: 0,
            hard_solved: 0,
            total_solved: 0,
            topics_progress: Json(Vec::new()),
            topics_completed: Vec::new(),
            marked_for_revision: 0,
            solved_questions: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn summary(&self) -> ProgressSummary {
        ProgressSummary {
            easy_solved: self.easy_solved,
            medium_solved: self.medium_solved,
            hard_solved: self.hard_solved,
            total_solved: self.total_solved,
            streak_count: self.streak_count,
            topics_progress: self.topics_progress.0.clone(),
            last_visited: self.last_visited,
        }
    }

    /// Loads the progress row for a user
    pub async fn find_by_user(pool: &PgPool, user_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Progress>("SELECT * FROM progress WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Loads the progress row, inserting an empty one first if needed
    pub async fn find_or_create(pool: &PgPool, user_id: Uuid) -> Result<Self, sqlx::Error> {
        sqlx::query("INSERT INTO progress (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
            .bind(user_id)
            .execute(pool)
            .await?;

        sqlx::query_as::<_, Progress>("SELECT * FROM progress WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await
    }

    /// Writes every mutable column back
    pub async fn save(&self, pool: &PgPool) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Progress>(
            r#"
            UPDATE progress
            SET last_visited = $2,
                streak_count = $3,
                easy_solved = $4,
                medium_solved = $5,
                hard_solved = $6,
                total_solved = $7,
                topics_progress = $8,
                topics_completed = $9,
                marked_for_revision = $10,
                solved_questions = $11,
                updated_at = NOW()
            WHERE user_id = $1
            RETURNING *
            "#,
        )
        .bind(self.user_id)
        .bind(self.last_visited)
        .bind(self.streak_count)
        .bind(self.easy_solved)
        .bind(self.medium_solved)
        .bind(self.hard_solved)
        .bind(self.total_solved)
        .bind(&self.topics_progress)
        .bind(&self.topics_completed)
        .bind(self.marked_for_revision)
        .bind(&self.solved_questions)
        .fetch_one(pool)
        .await
    }
}
