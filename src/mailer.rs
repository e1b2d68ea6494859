use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::errors::AppError;

/// Mailer
///
/// Out-of-band delivery of confirmation codes. Handlers only see this trait, so the shipped
/// log-backed mailer and the recording mock used in tests are interchangeable.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Delivers `code` to `email` for the account `username`.
    async fn send_confirmation_code(
        &self,
        email: &str,
        username: &str,
        code: &str,
    ) -> Result<(), AppError>;
}

/// LogMailer
///
/// Writes the message to the structured log instead of an SMTP relay, the equivalent of a
/// console email backend. Suitable for local use and for deployments that scrape the log.
#[derive(Clone)]
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
    async fn send_confirmation_code(
        &self,
        email: &str,
        username: &str,
        code: &str,
    ) -> Result<(), AppError> {
        tracing::info!(
            from = %self.from,
            to = %email,
            %username,
            subject = "YaMDb registration confirmation code",
            body = %format!("Confirmation code: {code}"),
            "Sending confirmation mail"
        );
        Ok(())
    }
}

/// SentMail
///
/// One message captured by [`MockMailer`].
#[derive(Debug, Clone, PartialEq)]
pub struct SentMail {
    pub email: String,
    pub username: String,
    pub code: String,
}

/// MockMailer
///
/// Records every message so tests can read back the issued code.
#[derive(Clone, Default)]
pub struct MockMailer {
    sent: Arc<Mutex<Vec<SentMail>>>,
    /// When true, all deliveries fail.
    pub should_fail: bool,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }

    /// The most recent code mailed to `username`, if any.
    pub fn last_code_for(&self, username: &str) -> Option<String> {
        self.sent()
            .into_iter()
            .rev()
            .find(|mail| mail.username == username)
            .map(|mail| mail.code)
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send_confirmation_code(
        &self,
        email: &str,
        username: &str,
        code: &str,
    ) -> Result<(), AppError> {
        if self.should_fail {
            return Err(AppError::Mail("Mock mailer: simulated failure".to_string()));
        }
        let mut sent = self
            .sent
            .lock()
            .map_err(|_| AppError::Mail("Mock mailer: poisoned lock".to_string()))?;
        sent.push(SentMail {
            email: email.to_string(),
            username: username.to_string(),
            code: code.to_string(),
        });
        Ok(())
    }
}

/// MailerState
///
/// Shared handle stored in `AppState`.
pub type MailerState = Arc<dyn Mailer>;
