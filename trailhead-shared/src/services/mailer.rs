/// Transactional mail
///
/// Rendering and delivery are outside this crate; [`LogMailer`] records each
/// message through `tracing` instead of sending it.

use async_trait::async_trait;
use serde_json::Value;

/// Error raised when a message could not be handed off
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Mail delivery failed: {0}")]
    Delivery(String),
}

/// Messages the application sends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailTemplate {
    Welcome,
    PasswordReset,
}

impl MailTemplate {
    pub fn name(&self) -> &'static str {
        match self {
            MailTemplate::Welcome => "welcome",
            MailTemplate::PasswordReset => "passwordReset",
        }
    }

    pub fn subject(&self) -> &'static str {
        match self {
            MailTemplate::Welcome => "Welcome to the Trailhead family!",
            MailTemplate::PasswordReset => "Your password reset token (valid for only 10 minutes)",
        }
    }
}

/// One outgoing message
#[derive(Debug, Clone)]
pub struct MailMessage {
    pub to: String,
    pub template: MailTemplate,
    /// Template variables (`firstName`, `url`)
    pub variables: Value,
}

impl MailMessage {
    /// Message addressed to a user, greeting them by first name
    pub fn new(to: &str, name: &str, template: MailTemplate, url: &str) -> Self {
        let first_name = name.split_whitespace().next().unwrap_or(name);
        Self {
            to: to.to_string(),
            template,
            variables: serde_json::json!({
                "firstName": first_name,
                "url": url,
            }),
        }
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: MailMessage) -> Result<(), MailError>;
}

/// Mailer that only logs what it would send
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
    async fn send(&self, message: MailMessage) -> Result<(), MailError> {
        tracing::info!(
            from = %self.from,
            to = %message.to,
            template = message.template.name(),
            subject = message.template.subject(),
            variables = %message.variables,
            "Sending mail"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_uses_first_name() {
        let message = MailMessage::new(
            "laura@example.com",
            "Laura Wilson",
            MailTemplate::Welcome,
            "http://localhost:3000/me",
        );

        assert_eq!(message.variables["firstName"], "Laura");
        assert_eq!(message.variables["url"], "http://localhost:3000/me");
    }

    #[tokio::test]
    async fn test_log_mailer_accepts_messages() {
        let mailer = LogMailer::new("noreply@trailhead.dev");
        let message = MailMessage::new(
            "laura@example.com",
            "Laura",
            MailTemplate::PasswordReset,
            "http://localhost:3000/api/v1/users/resetPassword/abc",
        );

        assert!(mailer.send(message).await.is_ok());
    }
}
