/// Google and GitHub sign-in
///
/// # Endpoints
///
/// - `GET /api/auth/google`, `GET /api/auth/github`: redirect to the provider
/// - `GET /api/auth/google/callback`, `GET /api/auth/github/callback`:
///   finish sign-in, set the session cookie, redirect to the frontend

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Query, State},
    response::Redirect,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use dsamate_shared::{
    auth::{
        jwt::{self, Claims, TokenType},
        middleware::session_cookie,
        oauth::{self, OAuthClient, OAuthError, OAuthProvider},
    },
    models::user::User,
};
use serde::Deserialize;

/// Query string the provider redirects back with
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

fn client_for(state: &AppState, provider: OAuthProvider) -> Result<&OAuthClient, OAuthError> {
    let (client, name) = match provider {
        OAuthProvider::Google => (state.config.oauth.google.as_ref(), "Google"),
        OAuthProvider::Github => (state.config.oauth.github.as_ref(), "GitHub"),
    };
    client.ok_or(OAuthError::NotConfigured(name))
}

fn start(state: &AppState, provider: OAuthProvider) -> ApiResult<Redirect> {
    let client = client_for(state, provider)?;
    let signed_state = oauth::sign_state(state.jwt_secret(), Utc::now());
    let url = oauth::authorize_url(provider, client, &signed_state)?;
    Ok(Redirect::to(url.as_str()))
}

async fn finish(
    state: &AppState,
    provider: OAuthProvider,
    jar: CookieJar,
    query: CallbackQuery,
) -> ApiResult<(CookieJar, Redirect)> {
    if let Some(error) = query.error {
        tracing::warn!(provider = provider.as_str(), error = %error, "OAuth sign-in declined");
        return Err(ApiError::BadRequest(format!("Sign-in was not completed: {}", error)));
    }

    let code = query
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing authorization code".to_string()))?;
    let returned_state = query.state.ok_or(OAuthError::InvalidState)?;
    oauth::verify_state(&returned_state, state.jwt_secret(), Utc::now())?;

    let client = client_for(state, provider)?;
    let access_token = oauth::exchange_code(&state.http, provider, client, &code).await?;
    let profile = oauth::fetch_profile(&state.http, provider, &access_token).await?;

    let user = User::find_or_create_oauth(&state.db, &profile, provider).await?;
    tracing::info!(user_id = %user.id, provider = provider.as_str(), "OAuth sign-in");

    let claims = Claims::new(user.id, user.email.clone(), TokenType::Session);
    let token = jwt::create_token(&claims, state.jwt_secret())?;
    let jar = jar.add(session_cookie(token, state.secure_cookies()));

    Ok((jar, Redirect::to(&state.config.api.public_base_url)))
}

pub async fn google_start(State(state): State<AppState>) -> ApiResult<Redirect> {
    start(&state, OAuthProvider::Google)
}

pub async fn github_start(State(state): State<AppState>) -> ApiResult<Redirect> {
    start(&state, OAuthProvider::Github)
}

pub async fn google_callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<CallbackQuery>,
) -> ApiResult<(CookieJar, Redirect)> {
    finish(&state, OAuthProvider::Google, jar, query).await
}

pub async fn github_callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<CallbackQuery>,
) -> ApiResult<(CookieJar, Redirect)> {
    finish(&state, OAuthProvider::Github, jar, query).await
}
