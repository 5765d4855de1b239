/// Outbound e-mail
///
/// Everything that sends mail goes through the [`Mailer`] trait:
///
/// - [`HttpMailer`]: posts messages to an HTTP mail relay
/// - [`LogMailer`]: logs messages instead of sending them (no relay configured)
/// - [`MemoryMailer`]: keeps messages in memory, for tests
///
/// # Example
///
/// ```no_run
/// use dsamate_shared::mail::{templates, LogMailer, Mailer};
///
/// # async fn example() -> Result<(), dsamate_shared::mail::MailError> {
/// let mailer = LogMailer::new("DSAMate <noreply@example.com>");
/// mailer.send(&templates::otp_email("ada@example.com", "123456")).await?;
/// # Ok(())
/// # }
/// ```

pub mod http;
pub mod memory;
pub mod templates;

use async_trait::async_trait;
use serde::Serialize;
use validator::ValidateEmail;

pub use http::HttpMailer;
pub use memory::MemoryMailer;

/// Mail errors
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    /// Recipient address is not a valid e-mail address
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Relay rejected the message
    #[error("Mail relay returned {status}: {body}")]
    Rejected { status: u16, body: String },

    /// Relay could not be reached
    #[error("Mail relay request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// A rendered message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub html: String,
}

impl Email {
    /// Rejects malformed recipients before anything is sent
    ///
    /// Uses the same rule as the `#[validate(email)]` request checks, so any
    /// address accepted at sign-up can be mailed.
    pub fn validate(&self) -> Result<(), MailError> {
        if self.to.validate_email() {
            Ok(())
        } else {
            Err(MailError::InvalidAddress(self.to.clone()))
        }
    }
}

/// Sends rendered messages
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    async fn send(&self, email: &Email) -> Result<(), MailError>;
}

/// Logs messages instead of sending them
#[derive(Debug, Clone)]
pub struct LogMailer {
    from: String,
}

impl LogMailer {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, email: &Email) -> Result<(), MailError> {
        email.validate()?;

        tracing::info!(
            from = %self.from,
            to = %email.to,
            subject = %email.subject,
            "Mail relay not configured; message logged only"
        );
        tracing::debug!(html = %email.html, "Logged message body");

        Ok(())
    }
}
