/// Worker configuration
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 5)
/// - `PUBLIC_BASE_URL`: Frontend URL used for preference links in the mail
/// - `POTD_SEND_HOUR_UTC`: Hour of day (0-23, UTC) to send the POTD (default: 3)
/// - `POTD_RETRY_SECS`: Delay before retrying a failed run (default: 300)
/// - `MAIL_API_URL` / `MAIL_API_KEY` / `MAIL_FROM`: HTTP mail relay (log only when unset)

use dsamate_shared::mail::{HttpMailer, LogMailer, Mailer};
use serde::{Deserialize, Serialize};
use std::env;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_SEND_HOUR_UTC: u32 = 3;
pub const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_MAIL_FROM: &str = "DSAMate <noreply@dsamate.dev>";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub public_base_url: String,
    pub schedule: ScheduleConfig,
    pub mail: MailConfig,
}

/// When the daily job fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// 0-23
    pub send_hour_utc: u32,
    pub retry_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            send_hour_utc: DEFAULT_SEND_HOUR_UTC,
            retry_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    pub api_url: Option<String>,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub from: String,
}

impl MailConfig {
    /// HTTP relay when `api_url` is set, otherwise a mailer that only logs
    pub fn build_mailer(&self) -> anyhow::Result<Arc<dyn Mailer>> {
        let mailer: Arc<dyn Mailer> = match &self.api_url {
            Some(url) => {
                let http = reqwest::Client::builder()
                    .timeout(Duration::from_secs(15))
                    .build()?;
                Arc::new(HttpMailer::new(
                    http,
                    url.clone(),
                    self.api_key.clone(),
                    self.from.clone(),
                ))
            }
            None => {
                tracing::warn!("MAIL_API_URL not set; mail will only be logged");
                Arc::new(LogMailer::new(self.from.clone()))
            }
        };
        Ok(mailer)
    }
}

impl WorkerConfig {
    /// Loads configuration from the environment (and `.env` when present)
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;

        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u32>()?;

        let send_hour_utc = parse_send_hour(env::var("POTD_SEND_HOUR_UTC").ok().as_deref())?;

        let retry_secs = env::var("POTD_RETRY_SECS")
            .unwrap_or_else(|_| "300".to_string())
            .parse::<u64>()?;

        Ok(Self {
            database_url,
            max_connections,
            public_base_url: optional("PUBLIC_BASE_URL")
                .unwrap_or_else(|| DEFAULT_PUBLIC_BASE_URL.to_string()),
            schedule: ScheduleConfig {
                send_hour_utc,
                retry_secs,
            },
            mail: MailConfig {
                api_url: optional("MAIL_API_URL"),
                api_key: optional("MAIL_API_KEY"),
                from: optional("MAIL_FROM").unwrap_or_else(|| DEFAULT_MAIL_FROM.to_string()),
            },
        })
    }
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Parses the send hour, defaulting when unset
pub fn parse_send_hour(raw: Option<&str>) -> anyhow::Result<u32> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(DEFAULT_SEND_HOUR_UTC),
        Some(v) => {
            let hour = v.parse::<u32>()?;
            if hour > 23 {
                anyhow::bail!("POTD_SEND_HOUR_UTC must be between 0 and 23, got {}", hour);
            }
            Ok(hour)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_send_hour() {
        assert_eq!(parse_send_hour(None).unwrap(), 3);
        assert_eq!(parse_send_hour(Some("")).unwrap(), 3);
        assert_eq!(parse_send_hour(Some(" 0 ")).unwrap(), 0);
        assert_eq!(parse_send_hour(Some("23")).unwrap(), 23);
        assert!(parse_send_hour(Some("24")).is_err());
        assert!(parse_send_hour(Some("noon")).is_err());
    }

    #[test]
    fn test_mailer_without_relay_only_logs() {
        let mail = MailConfig {
            api_url: None,
            api_key: None,
            from: DEFAULT_MAIL_FROM.to_string(),
        };
        assert_eq!(mail.build_mailer().unwrap().name(), "log");

        let relay = MailConfig {
            api_url: Some("https://mail.example.com/send".to_string()),
            ..mail
        };
        assert_eq!(relay.build_mailer().unwrap().name(), "http");
    }

    #[test]
    fn test_schedule_default() {
        let schedule = ScheduleConfig::default();
        assert_eq!(schedule.send_hour_utc, DEFAULT_SEND_HOUR_UTC);
        assert_eq!(schedule.retry_secs, 300);
    }
}
