//! Notification events and their fan-out
//!
//! After a mutation has committed, the broadcaster builds exactly one
//! [`NotificationEvent`] and delivers it best-effort to the untrusted
//! side's event stream and to the alert sink. Neither delivery can fail
//! the command that triggered it.

use crate::alerts::{Alert, AlertSink};
use crate::state::{AgentProfile, AgentStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// How many undelivered events a slow channel subscriber may lag by
/// before older ones are dropped
const EVENT_BUFFER: usize = 64;

/// A fire-and-forget payload describing a state change
///
/// The variant name is the event name on the wire; only these names
/// ever cross the trust boundary outward.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum NotificationEvent {
    /// An agent's status changed
    #[serde(rename = "agent-status-changed", rename_all = "camelCase")]
    AgentStatusChanged {
        /// ID of the agent whose status changed
        agent_id: String,
        /// Display name of the agent
        agent_name: String,
        /// Status the agent changed to
        new_status: AgentStatus,
        /// When the change was applied
        timestamp: DateTime<Utc>,
    },
    /// An agent logged in
    #[serde(rename = "agent-logged-in", rename_all = "camelCase")]
    AgentLoggedIn {
        /// ID of the agent that logged in
        agent_id: String,
        /// Display name of the agent
        agent_name: String,
        /// When the login happened
        timestamp: DateTime<Utc>,
    },
}

/// Fan-out of notification events to the event stream and alert sink
#[derive(Clone)]
pub struct EventBroadcaster {
    events: broadcast::Sender<NotificationEvent>,
    alerts: Arc<dyn AlertSink>,
}

impl EventBroadcaster {
    /// Create a broadcaster that shows alerts on the given sink
    pub fn new(alerts: Arc<dyn AlertSink>) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self { events, alerts }
    }

    /// Subscribe to the untrusted-side event stream
    pub fn subscribe(&self) -> broadcast::Receiver<NotificationEvent> {
        self.events.subscribe()
    }

    /// Announce a committed status change
    pub fn agent_status_changed(&self, agent: &AgentProfile) {
        self.publish(NotificationEvent::AgentStatusChanged {
            agent_id: agent.id.clone(),
            agent_name: agent.name.clone(),
            new_status: agent.status,
            timestamp: agent.last_status_change.unwrap_or_else(Utc::now),
        });
    }

    /// Announce a successful login
    pub fn agent_logged_in(&self, agent: &AgentProfile) {
        self.publish(NotificationEvent::AgentLoggedIn {
            agent_id: agent.id.clone(),
            agent_name: agent.name.clone(),
            timestamp: Utc::now(),
        });
    }

    fn publish(&self, event: NotificationEvent) {
        // No subscribers just means no front-end is connected
        if self.events.send(event.clone()).is_err() {
            debug!(?event, "no event stream subscribers");
        }

        // Alert delivery is a detached one-shot task; its failure is
        // logged and never reaches the command caller.
        let sink = Arc::clone(&self.alerts);
        tokio::spawn(async move {
            match sink.show(Alert::for_event(&event)).await {
                Ok(ack) if ack.clicked => info!(?event, "alert clicked"),
                Ok(_) => {}
                Err(e) => warn!(error = %e, "alert delivery failed"),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::{AlertAck, SinkError};
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    struct RecordingSink {
        shown: Mutex<Vec<Alert>>,
        notify: tokio::sync::mpsc::UnboundedSender<()>,
    }

    impl RecordingSink {
        fn new() -> (Arc<Self>, tokio::sync::mpsc::UnboundedReceiver<()>) {
            let (notify, rx) = tokio::sync::mpsc::unbounded_channel();
            (
                Arc::new(Self {
                    shown: Mutex::new(Vec::new()),
                    notify,
                }),
                rx,
            )
        }
    }

    #[async_trait]
    impl AlertSink for RecordingSink {
        async fn show(&self, alert: Alert) -> Result<AlertAck, SinkError> {
            self.shown.lock().await.push(alert);
            let _ = self.notify.send(());
            Ok(AlertAck::default())
        }
    }

    struct FailingSink;

    #[async_trait]
    impl AlertSink for FailingSink {
        async fn show(&self, _alert: Alert) -> Result<AlertAck, SinkError> {
            Err(SinkError("toast surface went away".to_string()))
        }
    }

    fn sample_profile() -> AgentProfile {
        AgentProfile {
            id: "A1".to_string(),
            name: "Som".to_string(),
            department: "Sales".to_string(),
            status: AgentStatus::Available,
            last_status_change: Some(Utc::now()),
        }
    }

    #[tokio::test]
    async fn test_status_change_reaches_subscriber() {
        let (sink, _rx) = RecordingSink::new();
        let broadcaster = EventBroadcaster::new(sink);
        let mut events = broadcaster.subscribe();

        broadcaster.agent_status_changed(&sample_profile());

        let event = events.recv().await.unwrap();
        match event {
            NotificationEvent::AgentStatusChanged {
                agent_id,
                new_status,
                ..
            } => {
                assert_eq!(agent_id, "A1");
                assert_eq!(new_status, AgentStatus::Available);
            }
            other => panic!("Expected status change event, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_alert_sink_receives_event() {
        let (sink, mut rx) = RecordingSink::new();
        let broadcaster = EventBroadcaster::new(Arc::clone(&sink) as Arc<dyn AlertSink>);

        broadcaster.agent_logged_in(&sample_profile());

        // Wait for the detached delivery task
        rx.recv().await.unwrap();
        let shown = sink.shown.lock().await;
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].body, "Som logged in");
    }

    #[tokio::test]
    async fn test_sink_failure_does_not_panic_or_block() {
        let broadcaster = EventBroadcaster::new(Arc::new(FailingSink));
        let mut events = broadcaster.subscribe();

        broadcaster.agent_status_changed(&sample_profile());

        // The event stream still delivers even though the sink failed
        assert!(events.recv().await.is_ok());
    }

    #[test]
    fn test_event_wire_format() {
        let event = NotificationEvent::AgentStatusChanged {
            agent_id: "A1".to_string(),
            agent_name: "Som".to_string(),
            new_status: AgentStatus::Available,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "agent-status-changed");
        assert_eq!(json["agentId"], "A1");
        assert_eq!(json["agentName"], "Som");
        assert_eq!(json["newStatus"], "Available");
        assert!(json.get("timestamp").is_some());
    }
}
