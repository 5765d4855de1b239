/// User testimonials
///
/// Submitters choose whether the testimonial may be shown publicly and how
/// they are credited. The submitter's e-mail is stored but never published.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// How the author is credited on the public page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DisplayPreference {
    #[default]
    NameAndDesignation,
    NameOnly,
    Anonymous,
}

impl DisplayPreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayPreference::NameAndDesignation => "nameAndDesignation",
            DisplayPreference::NameOnly => "nameOnly",
            DisplayPreference::Anonymous => "anonymous",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "nameAndDesignation" => Some(DisplayPreference::NameAndDesignation),
            "nameOnly" => Some(DisplayPreference::NameOnly),
            "anonymous" => Some(DisplayPreference::Anonymous),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Testimonial {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub designation: String,
    pub rating: i32,
    pub liked_most: String,
    pub how_helped: String,
    pub feedback: String,
    pub can_show: bool,
    pub display_preference: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateTestimonial {
    pub name: String,
    pub email: String,
    pub designation: String,
    pub rating: i32,
    pub liked_most: String,
    pub how_helped: String,
    pub feedback: String,
    pub can_show: bool,
    pub display_preference: DisplayPreference,
}

/// What the public testimonial wall shows
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicTestimonial {
    pub id: Uuid,
    pub name: Option<String>,
    pub designation: Option<String>,
    pub rating: i32,
    pub liked_most: String,
    pub how_helped: String,
    pub feedback: String,
    pub display_preference: String,
    pub date: DateTime<Utc>,
}

impl Testimonial {
    /// Public projection honoring the display preference
    ///
    /// `nameOnly` hides the designation; `anonymous` hides name and
    /// designation. Unknown stored values are treated as anonymous.
    pub fn to_public(&self) -> PublicTestimonial {
        let preference =
            DisplayPreference::parse(&self.display_preference).unwrap_or(DisplayPreference::Anonymous);

        let (name, designation) = match preference {
            DisplayPreference::NameAndDesignation => {
                (Some(self.name.clone()), Some(self.designation.clone()))
            }
            DisplayPreference::NameOnly => (Some(self.name.clone()), None),
            DisplayPreference::Anonymous => (None, None),
        };

        PublicTestimonial {
            id: self.id,
            name,
            designation,
            rating: self.rating,
            liked_most: self.liked_most.clone(),
            how_helped: self.how_helped.clone(),
            feedback: self.feedback.clone(),
            display_preference: preference.as_str().to_string(),
            date: self.created_at,
        }
    }

    pub async fn create(pool: &PgPool, data: &CreateTestimonial) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Testimonial>(
            r#"
            INSERT INTO testimonials
                (name, email, designation, rating, liked_most, how_helped, feedback,
                 can_show, display_preference)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(&data.name)
        .bind(&data.email)
        .bind(&data.designation)
        .bind(data.rating)
        .bind(&data.liked_most)
        .bind(&data.how_helped)
        .bind(&data.feedback)
        .bind(data.can_show)
        .bind(data.display_preference.as_str())
        .fetch_one(pool)
        .await
    }

    /// Testimonials the authors allowed to be shown, newest first
    pub async fn list_public(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Testimonial>(
            "SELECT * FROM testimonials WHERE can_show ORDER BY created_at DESC",
        )
        .fetch_all(pool)
        .await
    }
}
