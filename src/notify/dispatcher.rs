//! Severity-based alert fan-out.
//!
//! Critical alerts go to admins and operators, warnings to operators only.
//! Delivery failures are logged and reported in the outcome; they never
//! propagate to the caller.

use std::collections::HashMap;
use std::sync::Arc;

use super::directory::UserDirectory;
use super::templates::{alert_subject, AlertRenderer, TEST_SUBJECT};
use super::transport::{MailMessage, MailTransport};
use super::NotifyError;
use crate::types::{AnomalyReport, PlantSnapshot, Role, Severity};

/// Why a dispatch did not try to send anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotAnomalous,
    TransportUnconfigured,
    NoRecipients,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Delivered { recipients: usize },
    Failed { recipients: usize, error: String },
    Skipped(SkipReason),
}

impl DispatchOutcome {
    /// Delivery was attempted, whether or not it succeeded.
    pub const fn attempted(&self) -> bool {
        !matches!(self, Self::Skipped(_))
    }

    pub const fn delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }
}

pub struct NotificationDispatcher {
    transport: Option<Arc<dyn MailTransport>>,
    directory: Arc<dyn UserDirectory>,
    fallback: HashMap<Role, Vec<String>>,
    renderer: AlertRenderer,
    frontend_url: Option<String>,
}

impl NotificationDispatcher {
    /// `transport = None` makes every dispatch a logged no-op.
    pub fn new(
        transport: Option<Arc<dyn MailTransport>>,
        directory: Arc<dyn UserDirectory>,
    ) -> Result<Self, NotifyError> {
        Ok(Self {
            transport,
            directory,
            fallback: HashMap::new(),
            renderer: AlertRenderer::new()?,
            frontend_url: None,
        })
    }

    /// Recipients to use for `role` when the directory lookup fails.
    #[must_use]
    pub fn with_fallback(mut self, role: Role, recipients: Vec<String>) -> Self {
        self.fallback.insert(role, recipients);
        self
    }

    #[must_use]
    pub fn with_frontend_url(mut self, url: Option<String>) -> Self {
        self.frontend_url = url.filter(|u| !u.is_empty());
        self
    }

    pub fn is_configured(&self) -> bool {
        self.transport.is_some()
    }

    /// Send an alert for `report` to the recipients its severity calls for.
    pub async fn dispatch(&self, report: &AnomalyReport, snapshot: &PlantSnapshot) -> DispatchOutcome {
        let roles: &[Role] = match report.severity() {
            Severity::Critical => &[Role::Admin, Role::Operator],
            Severity::Warning => &[Role::Operator],
            Severity::Normal => return DispatchOutcome::Skipped(SkipReason::NotAnomalous),
        };

        let Some(transport) = &self.transport else {
            tracing::warn!("Mail transport not configured, skipping alert notification");
            return DispatchOutcome::Skipped(SkipReason::TransportUnconfigured);
        };

        let recipients = self.resolve_recipients(roles).await;
        if recipients.is_empty() {
            tracing::warn!(severity = %report.severity(), "No recipients for alert notification");
            return DispatchOutcome::Skipped(SkipReason::NoRecipients);
        }

        let (text_body, html_body) =
            match self
                .renderer
                .render_alert(report, snapshot, self.frontend_url.as_deref())
            {
                Ok(bodies) => bodies,
                Err(e) => {
                    tracing::error!(error = %e, "Alert template rendering failed");
                    return DispatchOutcome::Failed {
                        recipients: recipients.len(),
                        error: e.to_string(),
                    };
                }
            };

        let message = MailMessage {
            subject: alert_subject(report.severity()),
            recipients,
            text_body,
            html_body: Some(html_body),
        };
        let count = message.recipients.len();

        match transport.send(&message).await {
            Ok(()) => {
                tracing::info!(
                    severity = %report.severity(),
                    anomalies = report.anomalies().len(),
                    recipients = count,
                    "Alert notification sent"
                );
                DispatchOutcome::Delivered { recipients: count }
            }
            Err(e) => {
                tracing::warn!(
                    transport = transport.transport_name(),
                    error = %e,
                    "Alert notification delivery failed"
                );
                DispatchOutcome::Failed {
                    recipients: count,
                    error: e.to_string(),
                }
            }
        }
    }

    /// Send a configuration test message to one address.
    pub async fn send_test(&self, recipient: &str) -> Result<(), NotifyError> {
        let transport = self.transport.as_ref().ok_or(NotifyError::NotConfigured)?;
        let message = MailMessage {
            recipients: vec![recipient.to_string()],
            subject: TEST_SUBJECT.to_string(),
            text_body: self.renderer.render_test()?,
            html_body: None,
        };
        transport.send(&message).await
    }

    /// Union of the roles' recipients, first occurrence wins.
    async fn resolve_recipients(&self, roles: &[Role]) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for &role in roles {
            let found = match self.directory.recipients_for(role).await {
                Ok(list) => list,
                Err(e) => {
                    tracing::warn!(role = %role, error = %e, "Recipient lookup failed, using fallback list");
                    self.fallback.get(&role).cloned().unwrap_or_default()
                }
            };
            for addr in found {
                if !out.iter().any(|a| a.eq_ignore_ascii_case(&addr)) {
                    out.push(addr);
                }
            }
        }
        out
    }
}
