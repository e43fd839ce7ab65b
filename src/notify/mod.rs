//! Alert Notifications
//!
//! Resolves recipients by role and severity, renders the alert message and
//! hands it to a mail transport.

mod directory;
mod dispatcher;
pub mod templates;
mod transport;

pub use directory::{StaticUserDirectory, UserDirectory, UserEntry};
pub use dispatcher::{DispatchOutcome, NotificationDispatcher, SkipReason};
pub use transport::{MailMessage, MailTransport, SmtpMailTransport, SmtpSettings};

/// Notification errors
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("SMTP delivery failed: {0}")]
    Smtp(String),
    #[error("template rendering failed: {0}")]
    Template(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("user directory error: {0}")]
    Directory(String),
    #[error("mail transport not configured")]
    NotConfigured,
}
