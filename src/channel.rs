//! Channel boundary
//!
//! The single conduit between the untrusted front-end and the
//! privileged backend: one WebSocket per front-end, multiplexing
//! request/response frames (correlated by the caller-chosen `id`) with
//! fire-and-forget event frames. Only the registered command names and
//! event names ever cross it; anything else is logged and dropped.

use crate::commands::{CommandRouter, Envelope};
use crate::context::AppContext;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};

/// The registered event names pushed to the untrusted side
///
/// One per [`crate::events::NotificationEvent`] variant; the `type`
/// field of every outbound event frame is drawn from this set.
pub const EVENT_NAMES: &[&str] = &["agent-status-changed", "agent-logged-in"];

/// Inbound request frame
///
/// `id` is chosen by the caller and echoed on the response, which is
/// what correlates the reply with the request.
#[derive(Debug, Deserialize)]
pub struct RequestFrame {
    /// Correlation id, echoed back on the response frame
    pub id: u64,
    /// Registered command name
    pub command: String,
    /// Command payload; defaults to null for payload-free commands
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Outbound response frame: the correlation id plus the envelope
#[derive(Debug, Serialize)]
pub struct ResponseFrame {
    /// Correlation id copied from the request
    pub id: u64,
    /// Command outcome
    #[serde(flatten)]
    pub envelope: Envelope,
}

/// WebSocket upgrade handler for the command/event channel
pub async fn channel_handler(ws: WebSocketUpgrade, State(ctx): State<AppContext>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, ctx))
}

// Handle one front-end connection
async fn handle_socket(socket: WebSocket, ctx: AppContext) {
    let (mut sender, mut receiver) = socket.split();
    let router = CommandRouter::new(ctx.clone());

    info!("channel client connected");

    // Use a channel to serialize all outbound traffic through one task
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<Message>();

    // Task to forward messages from channel to sender
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Err(e) = sender.send(msg).await {
                error!("Failed to send message: {}", e);
                break;
            }
        }
    });

    // Task to send periodic pings
    let ping_tx = tx.clone();
    let mut ping_task = tokio::spawn(async move {
        loop {
            tokio::time::sleep(tokio::time::Duration::from_secs(30)).await;
            if ping_tx.send(Message::Ping(vec![])).is_err() {
                break;
            }
        }
    });

    // Task to forward notification events to this client
    let mut events = ctx.events.subscribe();
    let event_tx = tx.clone();
    let mut event_task = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(text) => {
                        if event_tx.send(Message::Text(text)).is_err() {
                            break;
                        }
                    }
                    Err(e) => error!("Failed to serialize event: {}", e),
                },
                Err(RecvError::Lagged(skipped)) => {
                    // Events are fire-and-forget; dropping some under
                    // backpressure is allowed
                    warn!(skipped, "event stream lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    // Receive and answer command frames
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    let frame: RequestFrame = match serde_json::from_str(&text) {
                        Ok(frame) => frame,
                        Err(e) => {
                            // Without an id there is nothing to answer
                            warn!(error = %e, "dropping malformed frame");
                            continue;
                        }
                    };

                    let envelope = router.dispatch_raw(&frame.command, frame.payload).await;
                    let response = ResponseFrame {
                        id: frame.id,
                        envelope,
                    };
                    match serde_json::to_string(&response) {
                        Ok(text) => {
                            if tx.send(Message::Text(text)).is_err() {
                                break;
                            }
                        }
                        Err(e) => error!("Failed to serialize response: {}", e),
                    }
                }
                Ok(Message::Close(_)) => {
                    info!("channel client disconnected");
                    break;
                }
                Ok(Message::Pong(_)) => {
                    // Client responded to ping
                }
                Err(e) => {
                    error!("WebSocket error: {}", e);
                    break;
                }
                _ => {}
            }
        }
    });

    // Wait for any task to complete
    tokio::select! {
        _ = &mut send_task => {
            ping_task.abort();
            event_task.abort();
            recv_task.abort();
        }
        _ = &mut ping_task => {
            send_task.abort();
            event_task.abort();
            recv_task.abort();
        }
        _ = &mut event_task => {
            send_task.abort();
            ping_task.abort();
            recv_task.abort();
        }
        _ = &mut recv_task => {
            send_task.abort();
            ping_task.abort();
            event_task.abort();
        }
    }

    info!("channel connection closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::COMMAND_NAMES;
    use crate::events::NotificationEvent;
    use crate::state::AgentStatus;
    use chrono::Utc;
    use serde_json::json;

    #[test]
    fn test_request_frame_parses_with_payload() {
        let frame: RequestFrame = serde_json::from_str(
            r#"{"id": 7, "command": "agent-login", "payload": {"agentId": "A1", "credential": "x"}}"#,
        )
        .unwrap();
        assert_eq!(frame.id, 7);
        assert_eq!(frame.command, "agent-login");
        assert_eq!(frame.payload["agentId"], "A1");
    }

    #[test]
    fn test_request_frame_payload_defaults_to_null() {
        let frame: RequestFrame =
            serde_json::from_str(r#"{"id": 1, "command": "get-agents"}"#).unwrap();
        assert!(frame.payload.is_null());
    }

    #[test]
    fn test_request_frame_requires_id() {
        let result = serde_json::from_str::<RequestFrame>(r#"{"command": "get-agents"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_response_frame_echoes_id() {
        let response = ResponseFrame {
            id: 42,
            envelope: Envelope::fail("nope".to_string()),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json, json!({"id": 42, "success": false, "error": "nope"}));
    }

    #[test]
    fn test_every_event_name_is_registered() {
        let events = [
            NotificationEvent::AgentStatusChanged {
                agent_id: "A1".to_string(),
                agent_name: "Som".to_string(),
                new_status: AgentStatus::Available,
                timestamp: Utc::now(),
            },
            NotificationEvent::AgentLoggedIn {
                agent_id: "A1".to_string(),
                agent_name: "Som".to_string(),
                timestamp: Utc::now(),
            },
        ];
        for event in events {
            let json = serde_json::to_value(&event).unwrap();
            let name = json["type"].as_str().unwrap().to_string();
            assert!(EVENT_NAMES.contains(&name.as_str()), "unregistered: {}", name);
        }
    }

    #[test]
    fn test_command_and_event_names_do_not_overlap() {
        for name in EVENT_NAMES {
            assert!(!COMMAND_NAMES.contains(name));
        }
    }
}
