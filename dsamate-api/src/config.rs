/// Configuration management for the API server
///
/// This module loads configuration from environment variables and provides
/// a type-safe configuration struct.
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `API_HOST` / `API_PORT`: Bind address (default: 0.0.0.0:8080)
/// - `CORS_ORIGINS`: Comma-separated allowed origins (default: `*`)
/// - `PRODUCTION`: Enables HSTS and `Secure` cookies (default: false)
/// - `PUBLIC_BASE_URL`: Frontend URL used in redirects and mail links
/// - `JWT_SECRET`: Session signing key, at least 32 characters (required)
/// - `REDIS_URL`: Shared rate limit store (optional)
/// - `RATE_LIMIT_MAX` / `RATE_LIMIT_WINDOW_SECS`: Auth limiter (default: 5 per 900s)
/// - `GOOGLE_CLIENT_ID` / `GOOGLE_CLIENT_SECRET` / `GOOGLE_REDIRECT_URI`
/// - `GITHUB_CLIENT_ID` / `GITHUB_CLIENT_SECRET` / `GITHUB_REDIRECT_URI`
/// - `GITHUB_TOKEN` / `GITHUB_REPO_OWNER` / `GITHUB_REPO_NAME`: Leaderboard source
/// - `MAIL_API_URL` / `MAIL_API_KEY` / `MAIL_FROM`: HTTP mail relay (log only when unset)
/// - `CRON_SECRET`: Guards `POST /api/potd/send`
///
/// # Example
///
/// ```no_run
/// use dsamate_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use dsamate_shared::auth::oauth::OAuthClient;
use dsamate_shared::leaderboard::GithubRepo;
use serde::{Deserialize, Serialize};
use std::env;

pub const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_MAIL_FROM: &str = "DSAMate <noreply@dsamate.dev>";

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub rate_limit: RateLimitConfig,
    pub oauth: OAuthConfig,
    pub github: GithubConfig,
    pub mail: MailConfig,

    /// Shared secret expected in `X-Cron-Secret`; the endpoint is closed when unset
    pub cron_secret: Option<String>,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,

    /// Production mode: HSTS header and `Secure` session cookie
    pub production: bool,

    /// Frontend base URL, no trailing slash
    pub public_base_url: String,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// JWT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Secret key for JWT signing
    ///
    /// IMPORTANT: This must be kept secret and should be at least 32 bytes.
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,
}

/// Auth endpoint rate limiting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Requests allowed per window and client
    pub max_requests: u32,

    /// Window length in seconds
    pub window_secs: u64,

    /// Redis URL; counters are kept in process when unset
    pub redis_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OAuthConfig {
    pub google: Option<OAuthClient>,
    pub github: Option<OAuthClient>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    pub token: Option<String>,
    pub repo_owner: String,
    pub repo_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub from: String,
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

fn parse_origins(value: &str) -> Vec<String> {
    let origins: Vec<String> = value
        .split(',')
        .map(|o| o.trim().trim_end_matches('/').to_string())
        .filter(|o| !o.is_empty())
        .collect();

    if origins.is_empty() {
        vec!["*".to_string()]
    } else {
        origins
    }
}

fn oauth_client(prefix: &str) -> Option<OAuthClient> {
    Some(OAuthClient {
        client_id: optional(&format!("{prefix}_CLIENT_ID"))?,
        client_secret: optional(&format!("{prefix}_CLIENT_SECRET"))?,
        redirect_uri: optional(&format!("{prefix}_REDIRECT_URI"))?,
    })
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `DATABASE_URL` or `JWT_SECRET` is missing
    /// - `JWT_SECRET` is shorter than 32 characters
    /// - A numeric variable does not parse
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let host = env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("API_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()?;

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u32>()?;

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let max_requests = env::var("RATE_LIMIT_MAX")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u32>()?;
        let window_secs = env::var("RATE_LIMIT_WINDOW_SECS")
            .unwrap_or_else(|_| "900".to_string())
            .parse::<u64>()?;

        if max_requests == 0 || window_secs == 0 {
            anyhow::bail!("RATE_LIMIT_MAX and RATE_LIMIT_WINDOW_SECS must be positive");
        }

        Ok(Self {
            api: ApiConfig {
                host,
                port,
                cors_origins: parse_origins(
                    &env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string()),
                ),
                production: optional("PRODUCTION").map(|v| parse_bool(&v)).unwrap_or(false),
                public_base_url: optional("PUBLIC_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_PUBLIC_BASE_URL.to_string())
                    .trim_end_matches('/')
                    .to_string(),
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            jwt: JwtConfig { secret: jwt_secret },
            rate_limit: RateLimitConfig {
                max_requests,
                window_secs,
                redis_url: optional("REDIS_URL"),
            },
            oauth: OAuthConfig {
                google: oauth_client("GOOGLE"),
                github: oauth_client("GITHUB"),
            },
            github: GithubConfig {
                token: optional("GITHUB_TOKEN"),
                repo_owner: optional("GITHUB_REPO_OWNER")
                    .unwrap_or_else(|| "saumyayadav25".to_string()),
                repo_name: optional("GITHUB_REPO_NAME")
                    .unwrap_or_else(|| "cpp-dsa-sheet-testing".to_string()),
            },
            mail: MailConfig {
                api_url: optional("MAIL_API_URL"),
                api_key: optional("MAIL_API_KEY"),
                from: optional("MAIL_FROM").unwrap_or_else(|| DEFAULT_MAIL_FROM.to_string()),
            },
            cron_secret: optional("CRON_SECRET"),
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Repository scored by the contributor leaderboard
    pub fn leaderboard_repo(&self) -> GithubRepo {
        GithubRepo {
            owner: self.github.repo_owner.clone(),
            name: self.github.repo_name.clone(),
            token: self.github.token.clone(),
        }
    }

    /// Configuration for tests and local tooling
    pub fn for_tests(database_url: impl Into<String>) -> Self {
        Self {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                cors_origins: vec!["*".to_string()],
                production: false,
                public_base_url: DEFAULT_PUBLIC_BASE_URL.to_string(),
            },
            database: DatabaseConfig {
                url: database_url.into(),
                max_connections: 5,
            },
            jwt: JwtConfig {
                secret: "test-secret-key-at-least-32-bytes-long".to_string(),
            },
            rate_limit: RateLimitConfig {
                max_requests: 5,
                window_secs: 900,
                redis_url: None,
            },
            oauth: OAuthConfig::default(),
            github: GithubConfig {
                token: None,
                repo_owner: "saumyayadav25".to_string(),
                repo_name: "cpp-dsa-sheet-testing".to_string(),
            },
            mail: MailConfig {
                api_url: None,
                api_key: None,
                from: DEFAULT_MAIL_FROM.to_string(),
            },
            cron_secret: Some("test-cron-secret".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_address() {
        let config = Config::for_tests("postgresql://localhost/test");
        assert_eq!(config.bind_address(), "127.0.0.1:8080");
    }

    #[test]
    fn test_parse_origins() {
        assert_eq!(parse_origins("*"), vec!["*"]);
        assert_eq!(parse_origins(""), vec!["*"]);
        assert_eq!(
            parse_origins("https://dsamate.dev/, http://localhost:3000"),
            vec!["https://dsamate.dev", "http://localhost:3000"]
        );
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("true"));
        assert!(parse_bool("1"));
        assert!(parse_bool("YES"));
        assert!(!parse_bool("false"));
        assert!(!parse_bool("0"));
        assert!(!parse_bool("production"));
    }

    #[test]
    fn test_leaderboard_repo() {
        let repo = Config::for_tests("postgresql://localhost/test").leaderboard_repo();
        assert_eq!(repo.owner, "saumyayadav25");
        assert_eq!(repo.name, "cpp-dsa-sheet-testing");
        assert!(repo.token.is_none());
    }
}
