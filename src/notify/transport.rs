//! Outbound mail transport
//!
//! The SMTP implementation uses `lettre` with STARTTLS (or implicit TLS on
//! port 465). Credentials come from `SMTP_USERNAME` / `SMTP_PASSWORD`.

use async_trait::async_trait;
use lettre::{
    message::{Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use super::NotifyError;

/// A rendered message ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub recipients: Vec<String>,
    pub subject: String,
    pub text_body: String,
    /// When absent the message goes out as plain text only.
    pub html_body: Option<String>,
}

/// Mail sink.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: &MailMessage) -> Result<(), NotifyError>;

    fn transport_name(&self) -> &str;
}

/// SMTP settings, minus credentials.
#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub tls: bool,
    pub from: String,
}

pub struct SmtpMailTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailTransport {
    /// Build a transport authenticated with the given credentials.
    pub fn new(settings: &SmtpSettings, credentials: Credentials) -> Result<Self, NotifyError> {
        let from: Mailbox = settings
            .from
            .parse()
            .map_err(|e: lettre::address::AddressError| NotifyError::Config(e.to_string()))?;

        let builder = if settings.port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
                .map_err(|e| NotifyError::Config(e.to_string()))?
        } else if settings.tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
                .map_err(|e| NotifyError::Config(e.to_string()))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host)
        };

        let transport = builder
            .port(settings.port)
            .credentials(credentials)
            .build();

        Ok(Self { transport, from })
    }

    /// Build from settings and the `SMTP_USERNAME` / `SMTP_PASSWORD` environment.
    ///
    /// Returns `Ok(None)` when credentials are not set: the transport is
    /// unconfigured and notification becomes a no-op.
    pub fn from_env(settings: &SmtpSettings) -> Result<Option<Self>, NotifyError> {
        match (std::env::var("SMTP_USERNAME"), std::env::var("SMTP_PASSWORD")) {
            (Ok(user), Ok(pass)) if !user.is_empty() && !pass.is_empty() => {
                Self::new(settings, Credentials::new(user, pass)).map(Some)
            }
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    async fn send(&self, message: &MailMessage) -> Result<(), NotifyError> {
        let mut builder = Message::builder().from(self.from.clone());
        for addr in &message.recipients {
            let mailbox: Mailbox = addr
                .parse()
                .map_err(|e: lettre::address::AddressError| NotifyError::Config(e.to_string()))?;
            builder = builder.to(mailbox);
        }
        builder = builder.subject(&message.subject);

        let email = match &message.html_body {
            Some(html) => builder.multipart(MultiPart::alternative_plain_html(
                message.text_body.clone(),
                html.clone(),
            )),
            None => builder.body(message.text_body.clone()),
        }
        .map_err(|e| NotifyError::Smtp(e.to_string()))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| NotifyError::Smtp(e.to_string()))?;

        tracing::info!(
            channel = "email",
            subject = %message.subject,
            recipients = message.recipients.len(),
            "Mail delivered"
        );
        Ok(())
    }

    fn transport_name(&self) -> &str {
        "smtp"
    }
}
