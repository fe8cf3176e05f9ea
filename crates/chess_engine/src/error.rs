//! Error types for chess engine
//!
//! Provides custom error types for rules-engine operations including
//! move validation, board invariants, and game state transitions.

use crate::types::{Coordinate, PieceId, Team};
use thiserror::Error;

/// Errors that can occur in the chess engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChessEngineError {
    /// Locally submitted move is not in the piece's legal move list
    #[error("Invalid move: {piece} to {destination}")]
    InvalidMove {
        piece: PieceId,
        destination: Coordinate,
    },

    /// Move received from the remote side failed re-validation
    #[error("Invalid opponent move: {piece} to {destination}")]
    InvalidOpponentMove {
        piece: PieceId,
        destination: Coordinate,
    },

    /// Move submitted by the team that is not on turn
    #[error("Not {team}'s turn")]
    WrongTurn { team: Team },

    /// Move submitted after the match left the Playing state
    #[error("Game is already over")]
    GameOver,

    /// Coordinate outside the 8x8 board
    #[error("Invalid coordinate ({row}, {col}) (must be 0-7)")]
    InvalidCoordinate { row: i8, col: i8 },

    /// Attempt to place a piece on a cell that is already taken
    #[error("Square {square} is already occupied")]
    SquareOccupied { square: Coordinate },

    /// Piece ID not registered on this board
    #[error("Unknown piece {piece}")]
    UnknownPiece { piece: PieceId },

    /// Descriptor disagrees with the live board about where a piece stands
    #[error("Piece {piece} is not at {expected}")]
    StalePiece { piece: PieceId, expected: Coordinate },

    /// Undo would push a move counter below zero
    #[error("Move counter underflow for piece {piece}")]
    MoveCounterUnderflow { piece: PieceId },

    /// Undo requested with an empty history
    #[error("No move to undo")]
    EmptyHistory,

    /// Custom setup is missing a king or has more than one per team
    #[error("Board setup error: {message}")]
    InvalidSetup { message: String },
}

/// Result type alias for chess engine operations
pub type ChessEngineResult<T> = Result<T, ChessEngineError>;
