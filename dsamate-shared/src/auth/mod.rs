/// Authentication utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing
/// - [`jwt`]: Session and password-reset JWTs
/// - [`otp`]: E-mailed one-time passwords
/// - [`oauth`]: Google and GitHub sign-in
/// - [`middleware`]: Axum session middleware and cookie helpers
///
/// # Example
///
/// ```no_run
/// use dsamate_shared::auth::password::{hash_password, verify_password};
/// use dsamate_shared::auth::jwt::{create_token, Claims, TokenType};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let claims = Claims::new(Uuid::new_v4(), "ada@example.com", TokenType::Session);
/// let token = create_token(&claims, "secret-key-of-at-least-32-bytes!")?;
/// # Ok(())
/// # }
/// ```

pub mod password;
pub mod jwt;
pub mod otp;
pub mod oauth;
pub mod middleware;
