/// Earned badges, one set per user
///
/// Badge names are unique within a set; [`BadgeSet::append`] only ever adds
/// names that are not already present.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

/// A single earned badge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    pub name: String,
    pub claimed_at: DateTime<Utc>,
}

/// Badge set row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BadgeSet {
    pub user_id: Uuid,
    pub badges: Json<Vec<Badge>>,
    pub updated_at: DateTime<Utc>,
}

impl BadgeSet {
    /// Loads a user's badge set
    pub async fn find_by_user(pool: &PgPool, user_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, BadgeSet>("SELECT * FROM badge_sets WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Badges of a user, empty when none were ever awarded
    pub async fn badges_of(pool: &PgPool, user_id: Uuid) -> Result<Vec<Badge>, sqlx::Error> {
        Ok(Self::find_by_user(pool, user_id)
            .await?
            .map(|set| set.badges.0)
            .unwrap_or_default())
    }

    /// Appends badges, creating the set when missing
    ///
    /// Names already held are dropped inside the statement, so concurrent
    /// awards of the same badge cannot produce duplicates.
    pub async fn append(
        pool: &PgPool,
        user_id: Uuid,
        new_badges: &[Badge],
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, BadgeSet>(
            r#"
            INSERT INTO badge_sets (user_id, badges)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE
            SET badges = badge_sets.badges || COALESCE((
                    SELECT jsonb_agg(b)
                    FROM jsonb_array_elements(EXCLUDED.badges) AS b
                    WHERE NOT EXISTS (
                        SELECT 1 FROM jsonb_array_elements(badge_sets.badges) AS held
                        WHERE held->>'name' = b->>'name'
                    )
                ), '[]'::jsonb),
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(Json(new_badges))
        .fetch_one(pool)
        .await
    }
}
