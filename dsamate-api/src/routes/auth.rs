/// Credentials authentication endpoints
///
/// Sign-up and sign-in are two-step: the password is checked first, then a
/// 6-digit OTP is mailed and must be confirmed. Password reset uses the same
/// OTP mail and hands out a short-lived reset token.
///
/// # Endpoints
///
/// - `POST /api/auth/sign-up`
/// - `POST /api/auth/sign-in`
/// - `POST /api/auth/verify-otp`
/// - `POST /api/auth/resend-otp`
/// - `POST /api/auth/forgot-password`
/// - `POST /api/auth/verify-forgot-password-otp`
/// - `POST /api/auth/change-password`
/// - `GET  /api/auth/check-auth` (session)
/// - `POST /api/auth/logout`

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
    routes::{present, MessageResponse},
};
use axum::{extract::State, Json};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use dsamate_shared::{
    auth::{
        jwt::{self, Claims, TokenType},
        middleware::{clear_session_cookie, session_cookie, AuthContext},
        otp::{check_otp, generate_otp},
        password,
    },
    mail::templates,
    models::user::{CreateUser, User},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Sign-up request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub full_name: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    pub password: Option<String>,
    pub confirm_password: Option<String>,
}

/// Sign-in request
#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// OTP confirmation request
#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    pub email: Option<String>,
    pub otp: Option<String>,
}

/// Request naming only an e-mail address
#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: Option<String>,
}

/// Password change request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub reset_token: Option<String>,
}

/// Response of a successful reset OTP check
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetTokenResponse {
    pub success: bool,
    pub message: String,
    pub reset_token: String,
}

/// Public view of the signed-in user
#[derive(Debug, Serialize)]
pub struct SessionUser {
    pub id: Uuid,
    pub full_name: Option<String>,
    pub email: String,
    pub avatar: Option<String>,
}

/// Response of `check-auth`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckAuthResponse {
    pub message: String,
    pub logged_in: bool,
    pub user: SessionUser,
}

/// Signs a session token for `user` and puts it in the session cookie
fn start_session(state: &AppState, jar: CookieJar, user: &User) -> ApiResult<CookieJar> {
    let claims = Claims::new(user.id, user.email.clone(), TokenType::Session);
    let token = jwt::create_token(&claims, state.jwt_secret())?;
    Ok(jar.add(session_cookie(token, state.secure_cookies())))
}

/// Issues a fresh OTP for `user` and mails it
async fn send_new_otp(state: &AppState, user: &User) -> ApiResult<()> {
    let otp = generate_otp();
    User::set_otp(&state.db, user.id, &otp.digest, otp.expires_at).await?;
    state
        .mailer
        .send(&templates::otp_email(&user.email, &otp.code))
        .await?;

    tracing::debug!(user_id = %user.id, "OTP issued");
    Ok(())
}

fn check_password_rules(password: &str) -> ApiResult<()> {
    password::validate_password_length(password).map_err(|message| {
        ApiError::ValidationError(vec![ValidationErrorDetail {
            field: "password".to_string(),
            message,
        }])
    })
}

/// Register a new credentials user
///
/// Any unverified registration with the same e-mail is replaced. The new
/// account stays unverified until `verify-otp` succeeds.
///
/// # Errors
///
/// - `400 Bad Request`: missing fields or passwords differ
/// - `409 Conflict`: a verified account owns the e-mail
/// - `422 Unprocessable Entity`: malformed e-mail or short password
/// - `429 Too Many Requests`: rate limited
pub async fn sign_up(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<SignUpRequest>,
) -> ApiResult<(CookieJar, Json<MessageResponse>)> {
    let (Some(full_name), Some(email), Some(password)) = (
        present(&req.full_name),
        present(&req.email),
        req.password.as_deref().filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::BadRequest("All fields are required.".to_string()));
    };

    if let Some(confirm) = req.confirm_password.as_deref() {
        if confirm != password {
            return Err(ApiError::BadRequest("Passwords do not match.".to_string()));
        }
    }

    req.validate()?;
    check_password_rules(password)?;

    if let Some(existing) = User::find_by_email(&state.db, email).await? {
        if existing.is_verified {
            return Err(ApiError::Conflict("Email is already registered.".to_string()));
        }
    }

    let password_hash = password::hash_password(password)?;
    let otp = generate_otp();

    let user = User::create_unverified(
        &state.db,
        CreateUser {
            full_name: Some(full_name.to_string()),
            email: email.to_string(),
            password_hash,
            otp_hash: otp.digest,
            otp_expires_at: otp.expires_at,
        },
    )
    .await?;

    state
        .mailer
        .send(&templates::otp_email(&user.email, &otp.code))
        .await?;

    tracing::info!(user_id = %user.id, "User signed up");

    let jar = start_session(&state, jar, &user)?;
    Ok((
        jar,
        Json(MessageResponse::ok("Signup successful. OTP sent to email.")),
    ))
}

/// Check the password of a verified user and mail a sign-in OTP
///
/// # Errors
///
/// - `400 Bad Request`: missing fields
/// - `404 Not Found`: no verified user with that e-mail
/// - `409 Conflict`: wrong password, or an OAuth account without one
pub async fn sign_in(
    State(state): State<AppState>,
    Json(req): Json<SignInRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let (Some(email), Some(password)) = (
        present(&req.email),
        req.password.as_deref().filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::BadRequest("All fields are required.".to_string()));
    };

    let user = User::find_by_email(&state.db, email)
        .await?
        .filter(|u| u.is_verified)
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let valid = match user.password_hash.as_deref() {
        Some(hash) => password::verify_password(password, hash)?,
        None => false,
    };
    if !valid {
        tracing::warn!(user_id = %user.id, "Failed sign-in attempt");
        return Err(ApiError::Conflict("Invalid credentials.".to_string()));
    }

    send_new_otp(&state, &user).await?;

    Ok(Json(MessageResponse::ok("Signin successful. OTP sent to email.")))
}

/// Confirm an OTP, verify the account and start a session
///
/// # Errors
///
/// - `400 Bad Request`: missing fields
/// - `404 Not Found`: unknown e-mail
/// - `401 Unauthorized`: wrong code or no code pending
/// - `410 Gone`: code expired
pub async fn verify_otp(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<VerifyOtpRequest>,
) -> ApiResult<(CookieJar, Json<MessageResponse>)> {
    let (Some(email), Some(otp)) = (present(&req.email), present(&req.otp)) else {
        return Err(ApiError::BadRequest("Email and OTP are required.".to_string()));
    };

    let user = User::find_by_email(&state.db, email)
        .await?
        .ok_or_else(|| ApiError::NotFound("No user exists with this email.".to_string()))?;

    check_otp(otp, user.otp_hash.as_deref(), user.otp_expires_at, Utc::now())?;
    User::consume_otp(&state.db, user.id, true).await?;

    tracing::info!(user_id = %user.id, "OTP verified");

    let jar = start_session(&state, jar, &user)?;
    Ok((jar, Json(MessageResponse::ok("Email verified successfully."))))
}

/// Mail a new OTP to an existing user
pub async fn resend_otp(
    State(state): State<AppState>,
    Json(req): Json<EmailRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let email = present(&req.email)
        .ok_or_else(|| ApiError::BadRequest("Email required".to_string()))?;

    let user = User::find_by_email(&state.db, email)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    send_new_otp(&state, &user).await?;

    Ok(Json(MessageResponse::ok("OTP resent")))
}

/// Start a password reset by mailing an OTP
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<EmailRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let email = present(&req.email)
        .ok_or_else(|| ApiError::BadRequest("Email required".to_string()))?;

    let user = User::find_by_email(&state.db, email)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found.".to_string()))?;

    send_new_otp(&state, &user).await?;

    Ok(Json(MessageResponse::ok("OTP sent to email.")))
}

/// Confirm a password-reset OTP and return a 15 minute reset token
///
/// # Errors
///
/// Same as [`verify_otp`], but only verified accounts qualify.
pub async fn verify_forgot_password_otp(
    State(state): State<AppState>,
    Json(req): Json<VerifyOtpRequest>,
) -> ApiResult<Json<ResetTokenResponse>> {
    let (Some(email), Some(otp)) = (present(&req.email), present(&req.otp)) else {
        return Err(ApiError::BadRequest("Email and OTP are required.".to_string()));
    };

    let user = User::find_by_email(&state.db, email)
        .await?
        .filter(|u| u.is_verified)
        .ok_or_else(|| ApiError::NotFound("No user exists with this email.".to_string()))?;

    check_otp(otp, user.otp_hash.as_deref(), user.otp_expires_at, Utc::now())?;
    User::consume_otp(&state.db, user.id, false).await?;

    let claims = Claims::new(user.id, user.email.clone(), TokenType::Reset);
    let reset_token = jwt::create_token(&claims, state.jwt_secret())?;

    Ok(Json(ResetTokenResponse {
        success: true,
        message: "OTP verified successfully.".to_string(),
        reset_token,
    }))
}

/// Set a new password using a reset token
///
/// # Errors
///
/// - `400 Bad Request`: missing fields
/// - `401 Unauthorized`: reset token invalid, expired or for another user
/// - `404 Not Found`: unknown e-mail
pub async fn change_password(
    State(state): State<AppState>,
    Json(req): Json<ChangePasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let (Some(email), Some(new_password), Some(reset_token)) = (
        present(&req.email),
        req.password.as_deref().filter(|p| !p.is_empty()),
        present(&req.reset_token),
    ) else {
        return Err(ApiError::BadRequest("All fields are required.".to_string()));
    };

    let claims = jwt::validate_reset_token(reset_token, state.jwt_secret())?;

    let user = User::find_by_email(&state.db, email)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found.".to_string()))?;

    if claims.sub != user.id {
        return Err(ApiError::Unauthorized("Reset token does not match this account".to_string()));
    }

    check_password_rules(new_password)?;

    let password_hash = password::hash_password(new_password)?;
    User::update_password(&state.db, user.id, &password_hash).await?;

    tracing::info!(user_id = %user.id, "Password changed");

    Ok(Json(MessageResponse::ok("Password Updated.")))
}

/// Report the signed-in user
pub async fn check_auth(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<CheckAuthResponse>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(CheckAuthResponse {
        message: "User found".to_string(),
        logged_in: true,
        user: SessionUser {
            id: user.id,
            full_name: user.full_name,
            email: user.email,
            avatar: user.avatar,
        },
    }))
}

/// Drop the session cookie
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<MessageResponse>) {
    let jar = jar.add(clear_session_cookie(state.secure_cookies()));
    (jar, Json(MessageResponse::ok("User Logged out")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_up_request_wire_names() {
        let req: SignUpRequest = serde_json::from_value(serde_json::json!({
            "fullName": "Ada",
            "email": "ada@example.com",
            "password": "longenough",
            "confirmPassword": "longenough"
        }))
        .unwrap();
        assert_eq!(req.full_name.as_deref(), Some("Ada"));
        assert_eq!(req.confirm_password.as_deref(), Some("longenough"));
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_sign_up_rejects_bad_email() {
        let req = SignUpRequest {
            full_name: Some("Ada".to_string()),
            email: Some("not-an-email".to_string()),
            password: Some("longenough".to_string()),
            confirm_password: None,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_password_rules() {
        assert!(check_password_rules("short").is_err());
        assert!(check_password_rules("long enough").is_ok());
    }

    #[test]
    fn test_check_auth_wire_format() {
        let body = serde_json::to_value(CheckAuthResponse {
            message: "User found".to_string(),
            logged_in: true,
            user: SessionUser {
                id: Uuid::nil(),
                full_name: None,
                email: "ada@example.com".to_string(),
                avatar: None,
            },
        })
        .unwrap();
        assert_eq!(body["loggedIn"], true);
        assert!(body["user"].get("full_name").is_some());
    }
}
