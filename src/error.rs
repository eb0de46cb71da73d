//! Error types and error handling for the application
//!
//! Every failure a command can hit is represented here. The command
//! router converts all of these into `{success: false, error}` response
//! envelopes; none of them may cross the trust boundary as a fault.

use thiserror::Error;

/// Application-level error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Agent with the given ID was not found
    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    /// Login failed. Deliberately identical for unknown id and wrong
    /// credential so callers cannot probe which one it was.
    #[error("Agent ID or credential is incorrect")]
    AuthFailed,

    /// Request name is not in the registered command set
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// Request payload failed shape or enum validation
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Persisted roster document exists but does not parse
    #[error("Roster document is corrupt: {0}")]
    StoreCorrupt(String),

    /// Persistence medium could not be read or written
    #[error("Roster storage unavailable: {0}")]
    StoreUnavailable(String),
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::StoreUnavailable(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_failed_message_is_fixed() {
        // The login error must not vary with the failure cause.
        assert_eq!(
            AppError::AuthFailed.to_string(),
            "Agent ID or credential is incorrect"
        );
    }

    #[test]
    fn test_io_error_maps_to_store_unavailable() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        match AppError::from(io) {
            AppError::StoreUnavailable(msg) => assert!(msg.contains("denied")),
            other => panic!("Expected StoreUnavailable, got: {:?}", other),
        }
    }
}
