/// Google and GitHub OAuth sign-in
///
/// Only the authorization-code flow is supported. The `state` parameter is a
/// self-contained HMAC-SHA256 token (`<nonce>.<issued_at>.<mac>`) keyed by the
/// session secret, so no server-side state store is needed.
///
/// # Example
///
/// ```
/// use dsamate_shared::auth::oauth::{sign_state, verify_state};
/// use chrono::Utc;
///
/// let state = sign_state("secret", Utc::now());
/// assert!(verify_state(&state, "secret", Utc::now()).is_ok());
/// ```

use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use rand::RngCore;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// How long an authorize redirect stays valid
pub const STATE_TTL_MINUTES: i64 = 10;

const GITHUB_USER_AGENT: &str = "dsamate";

/// Error type for OAuth operations
#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    /// Provider client id/secret not configured
    #[error("{0} sign-in is not configured")]
    NotConfigured(&'static str),

    /// `state` is malformed, forged or stale
    #[error("Invalid OAuth state")]
    InvalidState,

    /// Provider rejected the code or returned an unexpected payload
    #[error("OAuth provider error: {0}")]
    Provider(String),

    /// Provider did not expose an e-mail address
    #[error("No e-mail address available from provider")]
    MissingEmail,

    /// Transport failure
    #[error("OAuth request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Supported OAuth providers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthProvider {
    Google,
    Github,
}

impl OAuthProvider {
    /// Value stored in `users.provider`
    pub fn as_str(&self) -> &'static str {
        match self {
            OAuthProvider::Google => "google",
            OAuthProvider::Github => "github",
        }
    }

    fn authorize_endpoint(&self) -> &'static str {
        match self {
            OAuthProvider::Google => "https://accounts.google.com/o/oauth2/v2/auth",
            OAuthProvider::Github => "https://github.com/login/oauth/authorize",
        }
    }

    fn token_endpoint(&self) -> &'static str {
        match self {
            OAuthProvider::Google => "https://oauth2.googleapis.com/token",
            OAuthProvider::Github => "https://github.com/login/oauth/access_token",
        }
    }

    fn scope(&self) -> &'static str {
        match self {
            OAuthProvider::Google => "profile email",
            OAuthProvider::Github => "user:email",
        }
    }
}

/// Client registration for one provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthClient {
    pub client_id: String,
    #[serde(skip_serializing)]
    pub client_secret: String,
    pub redirect_uri: String,
}

/// Profile fields used to find or create a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthProfile {
    pub email: String,
    pub name: Option<String>,
    pub avatar: Option<String>,
}

/// Signs a fresh `state` value
pub fn sign_state(secret: &str, now: DateTime<Utc>) -> String {
    let mut nonce = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut nonce);
    let payload = format!("{}.{}", hex::encode(nonce), now.timestamp());
    format!("{}.{}", payload, mac_hex(secret, &payload))
}

/// Verifies a `state` value returned by the provider
pub fn verify_state(state: &str, secret: &str, now: DateTime<Utc>) -> Result<(), OAuthError> {
    let (payload, mac) = state.rsplit_once('.').ok_or(OAuthError::InvalidState)?;
    let (_, issued) = payload.split_once('.').ok_or(OAuthError::InvalidState)?;
    let issued: i64 = issued.parse().map_err(|_| OAuthError::InvalidState)?;
    let mac = hex::decode(mac).map_err(|_| OAuthError::InvalidState)?;

    let mut verifier = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| OAuthError::InvalidState)?;
    verifier.update(payload.as_bytes());
    verifier.verify_slice(&mac).map_err(|_| OAuthError::InvalidState)?;

    let age = now.timestamp() - issued;
    if !(0..=Duration::minutes(STATE_TTL_MINUTES).num_seconds()).contains(&age) {
        return Err(OAuthError::InvalidState);
    }

    Ok(())
}

fn mac_hex(secret: &str, payload: &str) -> String {
    // HMAC accepts keys of any length
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Builds the provider authorize URL the browser is redirected to
pub fn authorize_url(
    provider: OAuthProvider,
    client: &OAuthClient,
    state: &str,
) -> Result<Url, OAuthError> {
    let mut url = Url::parse(provider.authorize_endpoint())
        .map_err(|e| OAuthError::Provider(e.to_string()))?;

    url.query_pairs_mut()
        .append_pair("client_id", &client.client_id)
        .append_pair("redirect_uri", &client.redirect_uri)
        .append_pair("response_type", "code")
        .append_pair("scope", provider.scope())
        .append_pair("state", state);

    Ok(url)
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// Exchanges an authorization code for an access token
pub async fn exchange_code(
    http: &reqwest::Client,
    provider: OAuthProvider,
    client: &OAuthClient,
    code: &str,
) -> Result<String, OAuthError> {
    let params = [
        ("code", code),
        ("client_id", client.client_id.as_str()),
        ("client_secret", client.client_secret.as_str()),
        ("redirect_uri", client.redirect_uri.as_str()),
        ("grant_type", "authorization_code"),
    ];

    let response: TokenResponse = http
        .post(provider.token_endpoint())
        .header(reqwest::header::ACCEPT, "application/json")
        .form(&params)
        .send()
        .await?
        .json()
        .await?;

    match response.access_token {
        Some(token) => Ok(token),
        None => Err(OAuthError::Provider(
            response
                .error_description
                .or(response.error)
                .unwrap_or_else(|| "no access token returned".to_string()),
        )),
    }
}

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GithubUser {
    login: String,
    name: Option<String>,
    avatar_url: Option<String>,
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GithubEmail {
    email: String,
    primary: bool,
    #[serde(default)]
    verified: bool,
}

/// Fetches the signed-in user's profile
///
/// For GitHub the primary address from `/user/emails` is preferred over the
/// public profile e-mail, which is often hidden.
pub async fn fetch_profile(
    http: &reqwest::Client,
    provider: OAuthProvider,
    access_token: &str,
) -> Result<OAuthProfile, OAuthError> {
    match provider {
        OAuthProvider::Google => {
            let info: GoogleUserInfo = http
                .get("https://www.googleapis.com/oauth2/v2/userinfo")
                .bearer_auth(access_token)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;

            Ok(OAuthProfile {
                email: info.email.ok_or(OAuthError::MissingEmail)?,
                name: info.name,
                avatar: info.picture,
            })
        }
        OAuthProvider::Github => {
            let user: GithubUser = http
                .get("https://api.github.com/user")
                .bearer_auth(access_token)
                .header(reqwest::header::USER_AGENT, GITHUB_USER_AGENT)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;

            let emails: Vec<GithubEmail> = http
                .get("https://api.github.com/user/emails")
                .bearer_auth(access_token)
                .header(reqwest::header::USER_AGENT, GITHUB_USER_AGENT)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;

            let email = primary_github_email(&emails)
                .or(user.email)
                .ok_or(OAuthError::MissingEmail)?;

            Ok(OAuthProfile {
                email,
                name: user.name.or(Some(user.login)),
                avatar: user.avatar_url,
            })
        }
    }
}

fn primary_github_email(emails: &[GithubEmail]) -> Option<String> {
    emails
        .iter()
        .find(|e| e.primary && e.verified)
        .or_else(|| emails.iter().find(|e| e.primary))
        .map(|e| e.email.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    #[test]
    fn test_state_roundtrip() {
        let now = Utc::now();
        let state = sign_state(SECRET, now);
        assert_eq!(state.split('.').count(), 3);
        assert!(verify_state(&state, SECRET, now + Duration::minutes(1)).is_ok());
    }

    #[test]
    fn test_state_tampered() {
        let now = Utc::now();
        let state = sign_state(SECRET, now);
        let tampered = state.replacen('.', "0.", 1);
        assert!(matches!(
            verify_state(&tampered, SECRET, now),
            Err(OAuthError::InvalidState)
        ));
        assert!(verify_state(&state, "different-secret", now).is_err());
        assert!(verify_state("garbage", SECRET, now).is_err());
    }

    #[test]
    fn test_state_expired() {
        let issued = Utc::now() - Duration::minutes(STATE_TTL_MINUTES + 1);
        let state = sign_state(SECRET, issued);
        assert!(verify_state(&state, SECRET, Utc::now()).is_err());
    }

    #[test]
    fn test_authorize_url() {
        let client = OAuthClient {
            client_id: "cid".to_string(),
            client_secret: "cs".to_string(),
            redirect_uri: "http://localhost:8080/api/auth/github/callback".to_string(),
        };
        let url = authorize_url(OAuthProvider::Github, &client, "st").unwrap();

        assert_eq!(url.host_str(), Some("github.com"));
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("client_id".to_string(), "cid".to_string())));
        assert!(pairs.contains(&("scope".to_string(), "user:email".to_string())));
        assert!(pairs.contains(&("state".to_string(), "st".to_string())));
        assert!(pairs.contains(&(
            "redirect_uri".to_string(),
            "http://localhost:8080/api/auth/github/callback".to_string()
        )));
    }

    #[test]
    fn test_primary_github_email() {
        let emails = vec![
            GithubEmail { email: "old@x.dev".to_string(), primary: false, verified: true },
            GithubEmail { email: "main@x.dev".to_string(), primary: true, verified: true },
        ];
        assert_eq!(primary_github_email(&emails).as_deref(), Some("main@x.dev"));
        assert_eq!(primary_github_email(&[]), None);
    }
}
