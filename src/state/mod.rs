// State management module
// Agent data model, the authoritative roster store, and document persistence

/// Agent record, status enum, and boundary-safe projections
pub mod agent;
/// Roster document layout and the named-document storage seam
pub mod persistence;
/// The authoritative roster store
pub mod store;

pub use agent::{Agent, AgentId, AgentProfile, AgentStatus, RosterSnapshot};
pub use persistence::{DocumentStorage, FileDocumentStorage, RosterDocument};
pub use store::AgentStore;
