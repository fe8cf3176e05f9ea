//! # Chess rules engine
//!
//! Board model, legal-move generation (castling, en passant, promotion), check,
//! checkmate and draw detection, and the [`GameSession`] state machine that owns
//! a match.
//!
//! ## Module Organization
//!
//! - `types` - Teams, piece types, coordinates, vectors, move descriptors
//! - `board` - Piece arena and occupancy grid
//! - `make_unmake` - Apply and undo a move descriptor
//! - `attack` - "Is this king in check" query
//! - `move_gen` - Pseudo-legal generation and the check filter
//! - `game` - Turn order, move submission, terminal-state evaluation
//!
//! Nothing in this crate does I/O or async work; the server and the client both
//! embed it directly.

pub mod attack;
pub mod board;
pub mod error;
pub mod game;
pub mod make_unmake;
pub mod move_gen;
pub mod types;

pub use board::{Board, Piece};
pub use error::{ChessEngineError, ChessEngineResult};
pub use game::{GameSession, NO_CAPTURE_DRAW_LIMIT};
pub use make_unmake::UndoRecord;
pub use types::{
    Coordinate, MatchState, MoveDescriptor, PieceId, PieceSnapshot, PieceType, SecondaryMove, Team,
    Vector,
};
