//! Error types for the game server
//!
//! Transport failures on one session never escape that session: callers log
//! them and drive the session's teardown instead. Only binding the listener and
//! reading configuration can fail the server as a whole.

use crate::ids::SessionId;
use shared::{CodecError, ProtocolError};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The session's cancellation scope fired or teardown already ran
    #[error("session {session} is closed")]
    SessionClosed { session: SessionId },

    #[error("write to session {session} timed out after {timeout:?}")]
    WriteTimeout {
        session: SessionId,
        timeout: Duration,
    },

    #[error("invalid value for {key}: {message}")]
    Config { key: String, message: String },
}

/// Result type alias for server operations
pub type ServerResult<T> = Result<T, ServerError>;
