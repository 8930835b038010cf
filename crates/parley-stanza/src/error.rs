//! Error types for Parley stanza handling.

use std::io;
use thiserror::Error;

/// Result type for Parley operations.
pub type Result<T> = std::result::Result<T, ParleyError>;

/// Errors raised by the stanza layer and the agents built on it.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ParleyError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Transport closed")]
    Closed,

    #[error("Operation timed out")]
    Timeout,

    #[error("Agent stopped")]
    AgentStopped,

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Invalid JID: {0:?}")]
    InvalidJid(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ParleyError {
    /// Whether the failure came from the outbound side rather than the agent.
    #[inline]
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ParleyError::Transport(_) | ParleyError::Closed | ParleyError::Timeout
        )
    }
}
