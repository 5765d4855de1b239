/// In-memory mailer for tests
///
/// Keeps every accepted message so tests can read back OTP codes or check
/// what the daily job sent. Recipients listed in `fail_for` are rejected.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{Email, MailError, Mailer};

#[derive(Debug, Clone, Default)]
pub struct MemoryMailer {
    sent: Arc<Mutex<Vec<Email>>>,
    fail_for: Arc<Mutex<Vec<String>>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every send to `address` fail
    pub fn fail_for(&self, address: impl Into<String>) {
        if let Ok(mut failing) = self.fail_for.lock() {
            failing.push(address.into());
        }
    }

    /// Messages accepted so far
    pub fn sent(&self) -> Vec<Email> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }

    /// Most recent message to `address`
    pub fn last_to(&self, address: &str) -> Option<Email> {
        self.sent()
            .into_iter()
            .rev()
            .find(|email| email.to.eq_ignore_ascii_case(address))
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    fn name(&self) -> &str {
        "memory"
    }

    async fn send(&self, email: &Email) -> Result<(), MailError> {
        email.validate()?;

        let rejected = self
            .fail_for
            .lock()
            .map(|failing| failing.iter().any(|a| a.eq_ignore_ascii_case(&email.to)))
            .unwrap_or(false);
        if rejected {
            return Err(MailError::Rejected {
                status: 550,
                body: "mailbox unavailable".to_string(),
            });
        }

        if let Ok(mut sent) = self.sent.lock() {
            sent.push(email.clone());
        }
        Ok(())
    }
}
