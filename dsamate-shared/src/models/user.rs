/// User model and database operations
///
/// Credentials users sign up with an e-mail and password and stay
/// unverified until they confirm the e-mailed OTP. OAuth users are created
/// already verified and have no password hash.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     full_name VARCHAR(255),
///     email VARCHAR(320) NOT NULL,            -- unique on LOWER(email)
///     password_hash VARCHAR(255),
///     avatar TEXT,
///     provider VARCHAR(16) NOT NULL DEFAULT 'credentials',
///     is_verified BOOLEAN NOT NULL DEFAULT FALSE,
///     otp_hash VARCHAR(64),
///     otp_expires_at TIMESTAMPTZ,
///     subscribed_to_emails BOOLEAN NOT NULL DEFAULT TRUE,
///     subscribed_to_newsletter BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use dsamate_shared::models::user::{User, CreateUser};
/// use dsamate_shared::auth::otp::generate_otp;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let otp = generate_otp();
/// let user = User::create_unverified(&pool, CreateUser {
///     full_name: Some("Ada Lovelace".to_string()),
///     email: "ada@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     otp_hash: otp.digest,
///     otp_expires_at: otp.expires_at,
/// })
/// .await?;
///
/// assert!(!user.is_verified);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::oauth::{OAuthProfile, OAuthProvider};

/// User account
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID
    pub id: Uuid,

    /// Display name
    pub full_name: Option<String>,

    /// E-mail address, unique case-insensitively
    pub email: String,

    /// Argon2id hash; None for OAuth accounts
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,

    /// `data:` URL of an uploaded image or a provider picture URL
    pub avatar: Option<String>,

    /// `credentials`, `google` or `github`
    pub provider: String,

    /// Whether the e-mail address has been confirmed
    pub is_verified: bool,

    /// SHA-256 hex digest of the pending OTP
    #[serde(skip_serializing)]
    pub otp_hash: Option<String>,

    /// Expiry of the pending OTP
    #[serde(skip_serializing)]
    pub otp_expires_at: Option<DateTime<Utc>>,

    /// Receives the daily problem mail
    pub subscribed_to_emails: bool,

    /// Opted into the newsletter
    pub subscribed_to_newsletter: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for a credentials sign-up
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub full_name: Option<String>,
    pub email: String,
    /// Argon2id hash (never the plaintext password)
    pub password_hash: String,
    pub otp_hash: String,
    pub otp_expires_at: DateTime<Utc>,
}

/// Recipient row for bulk mail
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Subscriber {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
}

impl User {
    /// Creates an unverified credentials user
    ///
    /// Any earlier unverified registration with the same e-mail is removed
    /// first, so an abandoned sign-up never blocks a new one. Fails with a
    /// unique violation when a verified account already owns the address.
    pub async fn create_unverified(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM users WHERE LOWER(email) = LOWER($1) AND NOT is_verified")
            .bind(&data.email)
            .execute(&mut *tx)
            .await?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (full_name, email, password_hash, provider, is_verified,
                               otp_hash, otp_expires_at)
            VALUES ($1, $2, $3, 'credentials', FALSE, $4, $5)
            RETURNING *
            "#,
        )
        .bind(data.full_name)
        .bind(data.email)
        .bind(data.password_hash)
        .bind(data.otp_hash)
        .bind(data.otp_expires_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(user)
    }

    /// Creates a verified user from an OAuth profile, or returns the
    /// existing account with that e-mail
    ///
    /// The provider has confirmed the address, so an existing unverified
    /// account is verified and its pending OTP dropped.
    pub async fn find_or_create_oauth(
        pool: &PgPool,
        profile: &OAuthProfile,
        provider: OAuthProvider,
    ) -> Result<Self, sqlx::Error> {
        if let Some(user) = Self::find_by_email(pool, &profile.email).await? {
            if user.is_verified {
                return Ok(user);
            }

            return sqlx::query_as::<_, User>(
                r#"
                UPDATE users
                SET is_verified = TRUE, otp_hash = NULL, otp_expires_at = NULL,
                    updated_at = NOW()
                WHERE id = $1
                RETURNING *
                "#,
            )
            .bind(user.id)
            .fetch_one(pool)
            .await;
        }

        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (full_name, email, avatar, provider, is_verified)
            VALUES ($1, $2, $3, $4, TRUE)
            ON CONFLICT ((LOWER(email))) DO UPDATE
            SET is_verified = TRUE, otp_hash = NULL, otp_expires_at = NULL,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(&profile.name)
        .bind(&profile.email)
        .bind(&profile.avatar)
        .bind(provider.as_str())
        .fetch_one(pool)
        .await
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds a user by e-mail, ignoring case
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email.trim())
            .fetch_optional(pool)
            .await
    }

    /// Stores a new pending OTP, replacing any previous one
    pub async fn set_otp(
        pool: &PgPool,
        id: Uuid,
        otp_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET otp_hash = $2, otp_expires_at = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(otp_hash)
        .bind(expires_at)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Clears the pending OTP; with `mark_verified` also confirms the e-mail
    pub async fn consume_otp(
        pool: &PgPool,
        id: Uuid,
        mark_verified: bool,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET otp_hash = NULL,
                otp_expires_at = NULL,
                is_verified = is_verified OR $2,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(mark_verified)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Replaces the password hash
    pub async fn update_password(
        pool: &PgPool,
        id: Uuid,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Sets or clears the avatar
    pub async fn set_avatar(
        pool: &PgPool,
        id: Uuid,
        avatar: Option<&str>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "UPDATE users SET avatar = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(avatar)
        .fetch_optional(pool)
        .await
    }

    /// Stops the daily problem mail for `email`
    ///
    /// Returns false when no account has that address.
    pub async fn unsubscribe_emails(pool: &PgPool, email: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET subscribed_to_emails = FALSE, updated_at = NOW()
            WHERE LOWER(email) = LOWER($1)
            "#,
        )
        .bind(email.trim())
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Opts `email` into the newsletter
    pub async fn subscribe_newsletter(pool: &PgPool, email: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET subscribed_to_newsletter = TRUE, updated_at = NOW()
            WHERE LOWER(email) = LOWER($1)
            "#,
        )
        .bind(email.trim())
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists every user subscribed to the daily problem mail
    pub async fn list_email_subscribers(pool: &PgPool) -> Result<Vec<Subscriber>, sqlx::Error> {
        sqlx::query_as::<_, Subscriber>(
            r#"
            SELECT id, email, full_name
            FROM users
            WHERE subscribed_to_emails
            ORDER BY created_at
            "#,
        )
        .fetch_all(pool)
        .await
    }
}
