//! Command routing
//!
//! The single point where requests from the untrusted side are parsed,
//! validated, executed against the store, and mapped to response
//! envelopes. Every failure becomes `{success: false, error}`; no error
//! ever crosses the boundary as a fault.

use crate::context::AppContext;
use crate::error::AppError;
use crate::state::{AgentId, AgentProfile, AgentStatus, RosterSnapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

/// The registered command names, the only ones accepted at the boundary
pub const COMMAND_NAMES: &[&str] = &[
    "agent-login",
    "get-agents",
    "change-agent-status",
    "send-message",
    "say-hello",
];

/// Payload of `agent-login`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginPayload {
    /// ID of the agent logging in
    pub agent_id: AgentId,
    /// Credential to check
    pub credential: String,
}

/// Payload of `change-agent-status`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChangePayload {
    /// ID of the agent to update
    pub agent_id: AgentId,
    /// Status to change to; unrecognized values fail parsing
    pub new_status: AgentStatus,
}

/// Payload of `send-message`
#[derive(Debug, Clone, Deserialize)]
pub struct MessagePayload {
    /// Free-form text to echo back
    pub message: String,
}

/// Payload of `say-hello`
#[derive(Debug, Clone, Deserialize)]
pub struct HelloPayload {
    /// Name to greet
    pub name: String,
}

/// A validated request from the untrusted side
///
/// Constructed once per inbound frame and consumed exactly once by the
/// router. Never persisted.
#[derive(Debug, Clone)]
pub enum Command {
    /// `agent-login`
    Login(LoginPayload),
    /// `get-agents`
    GetRoster,
    /// `change-agent-status`
    ChangeStatus(StatusChangePayload),
    /// `send-message`
    SendMessage(MessagePayload),
    /// `say-hello`
    SayHello(HelloPayload),
}

impl Command {
    /// Parse a named command and its payload
    ///
    /// Names outside [`COMMAND_NAMES`] yield `UnknownCommand`; payloads
    /// that fail shape or enum validation yield `InvalidPayload`.
    pub fn parse(name: &str, payload: Value) -> Result<Self, AppError> {
        match name {
            "agent-login" => Ok(Command::Login(parse_payload(payload)?)),
            "get-agents" => Ok(Command::GetRoster),
            "change-agent-status" => Ok(Command::ChangeStatus(parse_payload(payload)?)),
            "send-message" => Ok(Command::SendMessage(parse_payload(payload)?)),
            "say-hello" => Ok(Command::SayHello(parse_payload(payload)?)),
            other => Err(AppError::UnknownCommand(other.to_string())),
        }
    }
}

fn parse_payload<T: serde::de::DeserializeOwned>(payload: Value) -> Result<T, AppError> {
    serde_json::from_value(payload).map_err(|e| AppError::InvalidPayload(e.to_string()))
}

/// Successful command outcome, flattened into the response envelope
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CommandReply {
    /// Reply to `agent-login`
    #[serde(rename_all = "camelCase")]
    Login {
        /// Projection of the authenticated agent
        agent: AgentProfile,
        /// Welcome message for display
        message: String,
    },
    /// Reply to `get-agents`
    #[serde(rename_all = "camelCase")]
    Roster {
        /// Snapshot of the roster
        data: RosterSnapshot,
        /// When the snapshot was taken
        timestamp: DateTime<Utc>,
    },
    /// Reply to `change-agent-status`
    #[serde(rename_all = "camelCase")]
    StatusChanged {
        /// Projection of the updated agent
        agent: AgentProfile,
        /// Confirmation message for display
        message: String,
    },
    /// Reply to `send-message`
    #[serde(rename_all = "camelCase")]
    Echo {
        /// The message as received
        original: String,
        /// Server acknowledgement text
        reply: String,
        /// When the message was processed
        timestamp: DateTime<Utc>,
        /// Always `"success"`, kept for front-end compatibility
        status: String,
    },
    /// Reply to `say-hello`
    #[serde(rename_all = "camelCase")]
    Greeting {
        /// The greeting line
        greeting: String,
        /// Name that was greeted
        name: String,
        /// Server time of the greeting
        time: DateTime<Utc>,
        /// Number of agents currently on the roster
        agent_count: usize,
    },
}

/// Response envelope handed back across the boundary
///
/// Exactly one of `reply` or `error` is present, keyed by `success`.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    /// Whether the command succeeded
    pub success: bool,
    /// Flattened success payload
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub reply: Option<CommandReply>,
    /// Human-readable failure message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Envelope {
    /// Successful envelope wrapping a reply
    pub fn ok(reply: CommandReply) -> Self {
        Self {
            success: true,
            reply: Some(reply),
            error: None,
        }
    }

    /// Failed envelope carrying an error message
    pub fn fail(error: String) -> Self {
        Self {
            success: false,
            reply: None,
            error: Some(error),
        }
    }
}

const GREETINGS: &[&str] = &[
    "Hello {name}! Welcome to the Agent Wallboard",
    "Hi {name}! Ready for the shift?",
    "Good to see you, {name}! Have a great day on the board",
];

/// Validates and dispatches commands against the store
pub struct CommandRouter {
    ctx: AppContext,
}

impl CommandRouter {
    /// Build a router over the given application context
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }

    /// Parse and dispatch a raw named command
    ///
    /// This is the entry point the channel boundary uses; parse errors
    /// get the same envelope treatment as execution errors.
    pub async fn dispatch_raw(&self, name: &str, payload: Value) -> Envelope {
        match Command::parse(name, payload) {
            Ok(command) => self.dispatch(command).await,
            Err(e) => {
                warn!(command = name, error = %e, "rejected command");
                Envelope::fail(e.to_string())
            }
        }
    }

    /// Dispatch a validated command, always producing an envelope
    pub async fn dispatch(&self, command: Command) -> Envelope {
        match self.execute(command).await {
            Ok(reply) => Envelope::ok(reply),
            Err(e) => {
                warn!(error = %e, "command failed");
                Envelope::fail(e.to_string())
            }
        }
    }

    async fn execute(&self, command: Command) -> Result<CommandReply, AppError> {
        match command {
            Command::Login(payload) => {
                let agent = self
                    .ctx
                    .store
                    .authenticate(&payload.agent_id, &payload.credential)
                    .await?;
                info!(agent_id = %agent.id, "agent logged in");
                self.ctx.events.agent_logged_in(&agent);
                let message = format!("Welcome, {}!", agent.name);
                Ok(CommandReply::Login { agent, message })
            }
            Command::GetRoster => Ok(CommandReply::Roster {
                data: self.ctx.store.load().await,
                timestamp: Utc::now(),
            }),
            Command::ChangeStatus(payload) => {
                let agent = self
                    .ctx
                    .store
                    .apply_status_change(&payload.agent_id, payload.new_status)
                    .await?;
                info!(agent_id = %agent.id, status = %agent.status, "status changed");
                // Fan-out only after the store has committed
                self.ctx.events.agent_status_changed(&agent);
                let message = format!("Status changed to {}", agent.status);
                Ok(CommandReply::StatusChanged { agent, message })
            }
            Command::SendMessage(payload) => Ok(CommandReply::Echo {
                reply: format!("Server received: \"{}\"", payload.message),
                original: payload.message,
                timestamp: Utc::now(),
                status: "success".to_string(),
            }),
            Command::SayHello(payload) => {
                let template = GREETINGS[payload.name.len() % GREETINGS.len()];
                Ok(CommandReply::Greeting {
                    greeting: template.replace("{name}", &payload.name),
                    agent_count: self.ctx.store.agent_count().await,
                    name: payload.name,
                    time: Utc::now(),
                })
            }
        }
    }
}
