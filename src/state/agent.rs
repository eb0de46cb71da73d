// Agent data model
// Contains the persisted agent record, its status enum, and the
// read-only projection handed across the trust boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for an agent
pub type AgentId = String;

/// Agent status enumeration
///
/// Closed set of recognized statuses. Anything else arriving from the
/// untrusted side fails deserialization and is rejected before it can
/// reach the roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentStatus {
    /// Agent is ready to take work
    Available,
    /// Agent is occupied and should not be disturbed
    Busy,
    /// Agent is not logged in
    Offline,
    /// Agent is currently on a call
    OnCall,
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AgentStatus::Available => "Available",
            AgentStatus::Busy => "Busy",
            AgentStatus::Offline => "Offline",
            AgentStatus::OnCall => "OnCall",
        };
        write!(f, "{}", name)
    }
}

/// Agent record as persisted in the roster document
///
/// Carries the login credential, so this type must never be serialized
/// across the trust boundary. Use [`AgentProfile`] for anything that
/// leaves the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    /// Unique identifier for the agent
    pub id: AgentId,
    /// Display name of the agent
    pub name: String,
    /// Department the agent belongs to
    pub department: String,
    /// Current status of the agent
    pub status: AgentStatus,
    /// Login credential for the agent
    ///
    /// Plaintext placeholder inherited from the sample data format.
    // TODO: replace plaintext credentials with hashed verification
    pub credential: String,
    /// When the status last changed; `None` until the first change
    #[serde(default)]
    pub last_status_change: Option<DateTime<Utc>>,
}

impl Agent {
    /// Build the read-only projection of this agent
    pub fn profile(&self) -> AgentProfile {
        AgentProfile {
            id: self.id.clone(),
            name: self.name.clone(),
            department: self.department.clone(),
            status: self.status,
            last_status_change: self.last_status_change,
        }
    }
}

/// Read-only projection of an agent, safe to hand to callers
///
/// Identical to [`Agent`] minus the credential.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentProfile {
    /// Unique identifier for the agent
    pub id: AgentId,
    /// Display name of the agent
    pub name: String,
    /// Department the agent belongs to
    pub department: String,
    /// Current status of the agent
    pub status: AgentStatus,
    /// When the status last changed, if ever
    pub last_status_change: Option<DateTime<Utc>>,
}

/// Snapshot of the full roster, as returned by a roster read
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RosterSnapshot {
    /// Projections of every agent, in document order
    pub agents: Vec<AgentProfile>,
}
