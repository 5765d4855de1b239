/// Roadmap topic progress and per-roadmap statistics
///
/// `roadmap_progress` holds one row per (user, roadmap, topic).
/// `roadmap_user_stats` is a derived summary recomputed by [`derive_stats`]
/// after every progress write; it is stored so the dashboard can read it
/// without re-walking the curriculum.
///
/// # Example
///
/// ```no_run
/// use dsamate_shared::models::roadmap_progress::{
///     RoadmapProgress, RoadmapStatus, UpsertRoadmapProgress,
/// };
/// # use sqlx::PgPool;
/// # use uuid::Uuid;
/// # async fn example(pool: PgPool, user_id: Uuid) -> Result<(), sqlx::Error> {
/// let row = RoadmapProgress::upsert(&pool, user_id, "dsa-fundamentals", &UpsertRoadmapProgress {
///     topic_id: "arrays-basics".to_string(),
///     level_id: "beginner".to_string(),
///     status: RoadmapStatus::InProgress,
///     time_spent: 30,
///     notes: String::new(),
/// })
/// .await?;
/// assert!(row.started_at.is_some());
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::catalog::roadmaps::Roadmap;
use crate::gamification::next_streak;

/// Longest accepted topic note
pub const MAX_NOTES_LENGTH: usize = 1000;

/// Status of a roadmap topic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoadmapStatus {
    NotStarted,
    InProgress,
    Completed,
    Skipped,
}

impl RoadmapStatus {
    /// Converts status to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            RoadmapStatus::NotStarted => "not-started",
            RoadmapStatus::InProgress => "in-progress",
            RoadmapStatus::Completed => "completed",
            RoadmapStatus::Skipped => "skipped",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "not-started" => Some(RoadmapStatus::NotStarted),
            "in-progress" => Some(RoadmapStatus::InProgress),
            "completed" => Some(RoadmapStatus::Completed),
            "skipped" => Some(RoadmapStatus::Skipped),
            _ => None,
        }
    }
}

/// Progress on one roadmap topic
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RoadmapProgress {
    pub id: Uuid,
    pub user_id: Uuid,
    pub roadmap_id: String,
    pub level_id: String,
    pub topic_id: String,
    /// One of [`RoadmapStatus`] in kebab-case
    pub status: String,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Minutes
    pub time_spent: i32,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RoadmapProgress {
    pub fn is_completed(&self) -> bool {
        self.status == RoadmapStatus::Completed.as_str()
    }

    pub fn is_in_progress(&self) -> bool {
        self.status == RoadmapStatus::InProgress.as_str()
    }
}

/// Input for [`RoadmapProgress::upsert`]
#[derive(Debug, Clone)]
pub struct UpsertRoadmapProgress {
    pub topic_id: String,
    pub level_id: String,
    pub status: RoadmapStatus,
    pub time_spent: i32,
    pub notes: String,
}

impl RoadmapProgress {
    /// A user's rows for one roadmap, oldest first
    pub async fn list(
        pool: &PgPool,
        user_id: Uuid,
        roadmap_id: &str,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, RoadmapProgress>(
            r#"
            SELECT * FROM roadmap_progress
            WHERE user_id = $1 AND roadmap_id = $2
            ORDER BY created_at, id
            "#,
        )
        .bind(user_id)
        .bind(roadmap_id)
        .fetch_all(pool)
        .await
    }

    /// Inserts or updates the row for a topic
    ///
    /// `started_at` is only set when the row is created as in-progress;
    /// `completed_at` is stamped on every write with status completed and
    /// otherwise left alone.
    pub async fn upsert(
        pool: &PgPool,
        user_id: Uuid,
        roadmap_id: &str,
        data: &UpsertRoadmapProgress,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, RoadmapProgress>(
            r#"
            INSERT INTO roadmap_progress
                (user_id, roadmap_id, level_id, topic_id, status, time_spent, notes,
                 started_at, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7,
                    CASE WHEN $5 = 'in-progress' THEN NOW() END,
                    CASE WHEN $5 = 'completed' THEN NOW() END)
            ON CONFLICT (user_id, roadmap_id, topic_id) DO UPDATE
            SET level_id = EXCLUDED.level_id,
                status = EXCLUDED.status,
                time_spent = EXCLUDED.time_spent,
                notes = EXCLUDED.notes,
                completed_at = CASE
                    WHEN EXCLUDED.status = 'completed' THEN NOW()
                    ELSE roadmap_progress.completed_at
                END,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(roadmap_id)
        .bind(&data.level_id)
        .bind(&data.topic_id)
        .bind(data.status.as_str())
        .bind(data.time_spent)
        .bind(&data.notes)
        .fetch_one(pool)
        .await
    }
}

/// Derived per-roadmap summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RoadmapUserStats {
    pub user_id: Uuid,
    pub roadmap_id: String,
    pub total_topics: i32,
    pub completed_topics: i32,
    pub in_progress_topics: i32,
    pub total_time_spent: i32,
    pub current_level: String,
    pub current_topic: Option<String>,
    pub completion_percentage: i32,
    pub streak: i32,
    pub last_activity_date: DateTime<Utc>,
    pub started_at: DateTime<Utc>,
}

impl RoadmapUserStats {
    /// Stats for a user who has not touched the roadmap yet
    pub fn initial(user_id: Uuid, roadmap: &Roadmap, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            roadmap_id: roadmap.id.clone(),
            total_topics: roadmap.total_topics() as i32,
            completed_topics: 0,
            in_progress_topics: 0,
            total_time_spent: 0,
            current_level: roadmap
                .first_level()
                .map(|l| l.id.clone())
                .unwrap_or_default(),
            current_topic: None,
            completion_percentage: 0,
            streak: 0,
            last_activity_date: now,
            started_at: now,
        }
    }

    pub async fn find(
        pool: &PgPool,
        user_id: Uuid,
        roadmap_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, RoadmapUserStats>(
            "SELECT * FROM roadmap_user_stats WHERE user_id = $1 AND roadmap_id = $2",
        )
        .bind(user_id)
        .bind(roadmap_id)
        .fetch_optional(pool)
        .await
    }

    /// Loads stats, inserting [`RoadmapUserStats::initial`] on first view
    pub async fn find_or_create(
        pool: &PgPool,
        user_id: Uuid,
        roadmap: &Roadmap,
    ) -> Result<Self, sqlx::Error> {
        if let Some(stats) = Self::find(pool, user_id, &roadmap.id).await? {
            return Ok(stats);
        }

        Self::initial(user_id, roadmap, Utc::now()).save(pool).await
    }

    /// Inserts or overwrites the stats row
    ///
    /// `started_at` of an existing row is kept.
    pub async fn save(&self, pool: &PgPool) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, RoadmapUserStats>(
            r#"
            INSERT INTO roadmap_user_stats
                (user_id, roadmap_id, total_topics, completed_topics, in_progress_topics,
                 total_time_spent, current_level, current_topic, completion_percentage,
                 streak, last_activity_date, started_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (user_id, roadmap_id) DO UPDATE
            SET total_topics = EXCLUDED.total_topics,
                completed_topics = EXCLUDED.completed_topics,
                in_progress_topics = EXCLUDED.in_progress_topics,
                total_time_spent = EXCLUDED.total_time_spent,
                current_level = EXCLUDED.current_level,
                current_topic = EXCLUDED.current_topic,
                completion_percentage = EXCLUDED.completion_percentage,
                streak = EXCLUDED.streak,
                last_activity_date = EXCLUDED.last_activity_date
            RETURNING *
            "#,
        )
        .bind(self.user_id)
        .bind(&self.roadmap_id)
        .bind(self.total_topics)
        .bind(self.completed_topics)
        .bind(self.in_progress_topics)
        .bind(self.total_time_spent)
        .bind(&self.current_level)
        .bind(&self.current_topic)
        .bind(self.completion_percentage)
        .bind(self.streak)
        .bind(self.last_activity_date)
        .bind(self.started_at)
        .fetch_one(pool)
        .await
    }
}

/// Recomputes stats from the full set of progress rows after an activity
/// at `now`
///
/// - completion percentage is `round(completed / total * 100)`, capped at 100
/// - the current level is the first level with fewer completed rows than
///   topics, and the current topic its first topic without a completed row;
///   when every level is done the last level is current with no topic
/// - the streak follows the calendar-day rule of [`next_streak`]
pub fn derive_stats(
    roadmap: &Roadmap,
    rows: &[RoadmapProgress],
    previous: Option<&RoadmapUserStats>,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> RoadmapUserStats {
    let total_topics = roadmap.total_topics() as i32;
    let completed_topics = rows.iter().filter(|r| r.is_completed()).count() as i32;
    let in_progress_topics = rows.iter().filter(|r| r.is_in_progress()).count() as i32;
    let total_time_spent = rows.iter().map(|r| r.time_spent.max(0)).sum();

    let completion_percentage = if total_topics > 0 {
        ((completed_topics as f64 / total_topics as f64) * 100.0)
            .round()
            .min(100.0) as i32
    } else {
        0
    };

    let mut current_level = roadmap.levels.last().map(|l| l.id.clone()).unwrap_or_default();
    let mut current_topic = None;

    for level in &roadmap.levels {
        let completed_here: Vec<&RoadmapProgress> = rows
            .iter()
            .filter(|r| r.level_id == level.id && r.is_completed())
            .collect();

        if completed_here.len() < level.topics.len() {
            current_level = level.id.clone();
            current_topic = level
                .topics
                .iter()
                .find(|t| !completed_here.iter().any(|r| r.topic_id == t.id))
                .map(|t| t.id.clone());
            break;
        }
    }

    let streak = next_streak(
        previous.map_or(0, |p| p.streak),
        previous.map(|p| p.last_activity_date),
        now,
    );

    RoadmapUserStats {
        user_id,
        roadmap_id: roadmap.id.clone(),
        total_topics,
        completed_topics,
        in_progress_topics,
        total_time_spent,
        current_level,
        current_topic,
        completion_percentage,
        streak,
        last_activity_date: now,
        started_at: previous.map_or(now, |p| p.started_at),
    }
}
