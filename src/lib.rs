//! Agent Wallboard Backend Library
//!
//! This library exposes modules for testing and external use.
//! The main binary is in `src/main.rs`.

pub mod alerts;
pub mod channel;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
/// Agent data model and roster store
///
/// Handles the agent roster, status changes, and document persistence.
pub mod state;
