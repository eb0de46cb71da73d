//! Application context
//!
//! Explicit handle bundle passed to the command router and the channel
//! boundary at construction. Nothing in the application reaches for
//! globals; everything the privileged side owns hangs off this struct.

use crate::events::EventBroadcaster;
use crate::state::AgentStore;
use std::sync::Arc;

/// Shared handles owned by the privileged side
#[derive(Clone)]
pub struct AppContext {
    /// Authoritative roster store
    pub store: Arc<AgentStore>,
    /// Fan-out for notification events (owns the alert-sink handle)
    pub events: EventBroadcaster,
}

impl AppContext {
    /// Bundle the store and broadcaster handles
    pub fn new(store: Arc<AgentStore>, events: EventBroadcaster) -> Self {
        Self { store, events }
    }
}
