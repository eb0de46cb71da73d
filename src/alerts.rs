//! User-facing alert sink
//!
//! Narrow seam over whatever renders toast notifications on the
//! privileged side. The backend only knows how to hand over a title,
//! a body, and an urgency, and to learn whether the user clicked.

use crate::events::NotificationEvent;
use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

/// Urgency of an alert, mapped by sinks to the platform's notion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    /// Regular notification, dismissed on the platform default timeout
    Normal,
    /// Sticky notification that demands attention
    Critical,
}

/// A user-visible alert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    /// Short headline
    pub title: String,
    /// One-line description of what happened
    pub body: String,
    /// How insistently the sink should present it
    pub urgency: Urgency,
}

impl Alert {
    /// Build the alert describing a notification event
    ///
    /// An agent dropping to `Offline` is the change a supervisor must
    /// not miss, so it is presented as critical; everything else is a
    /// normal notification.
    pub fn for_event(event: &NotificationEvent) -> Self {
        let (body, urgency) = match event {
            NotificationEvent::AgentStatusChanged {
                agent_name,
                new_status,
                ..
            } => {
                let urgency = match new_status {
                    crate::state::AgentStatus::Offline => Urgency::Critical,
                    _ => Urgency::Normal,
                };
                (
                    format!("{} changed status to {}", agent_name, new_status),
                    urgency,
                )
            }
            NotificationEvent::AgentLoggedIn { agent_name, .. } => {
                (format!("{} logged in", agent_name), Urgency::Normal)
            }
        };

        Self {
            title: "Agent Wallboard Update".to_string(),
            body,
            urgency,
        }
    }
}

/// Outcome of showing an alert
#[derive(Debug, Clone, Copy, Default)]
pub struct AlertAck {
    /// Whether the user clicked the alert before it was dismissed
    pub clicked: bool,
}

/// Delivery to the alert sink failed
///
/// Never surfaced to command callers; the broadcaster logs it and
/// moves on.
#[derive(Error, Debug)]
#[error("Alert sink failure: {0}")]
pub struct SinkError(pub String);

/// The external surface that renders user-visible notifications
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Display the alert and report whether it was clicked
    async fn show(&self, alert: Alert) -> Result<AlertAck, SinkError>;
}

/// Alert sink that writes alerts to the log
///
/// Stand-in for a native toast surface; useful in headless deployments
/// and as the default when no desktop integration is wired up.
pub struct TracingAlertSink;

#[async_trait]
impl AlertSink for TracingAlertSink {
    async fn show(&self, alert: Alert) -> Result<AlertAck, SinkError> {
        info!(title = %alert.title, body = %alert.body, "alert");
        Ok(AlertAck::default())
    }
}
