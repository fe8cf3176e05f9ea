//! Error types for the client connection
//!
//! Covers socket and codec failures plus rules-engine rejections surfaced
//! while mirroring a game locally.

use chess_engine::{ChessEngineError, MatchState};
use shared::{CodecError, ProtocolError};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Engine(#[from] ChessEngineError),

    /// Connect or write did not finish in time
    #[error("Timed out after {timeout:?} while {action}")]
    Timeout {
        action: &'static str,
        timeout: Duration,
    },

    /// The connection was closed locally or by the server
    #[error("Not connected to the server")]
    Disconnected,

    /// Only a win, a loss or a draw can be declared
    #[error("Cannot declare a result for state {state:?}")]
    NotDeclarable { state: MatchState },
}

/// Result type alias for client operations
pub type ClientResult<T> = Result<T, ClientError>;
