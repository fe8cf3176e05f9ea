//! # Chess Engine Core Types
//!
//! ## Overview
//!
//! This module defines the vocabulary every other part of the engine and the
//! network layer builds on: teams, piece types, coordinates, direction vectors,
//! piece identities and the move descriptor that travels between the rules
//! engine, the UI and the wire.
//!
//! ## Coordinates
//!
//! A [`Coordinate`] is a `(row, col)` pair on the 8x8 board:
//! - row 0 is White's back rank (rank 1), row 7 is Black's back rank (rank 8)
//! - col 0 is the a-file, col 7 is the h-file
//!
//! White pawns therefore move toward increasing rows and Black pawns toward
//! decreasing rows. Every direction vector in [`crate::move_gen`] and every
//! attack ray in [`crate::attack`] uses this same orientation.
//!
//! ## Live Pieces vs Snapshots
//!
//! The board owns [`crate::board::Piece`] values. Anything that leaves the board
//! (legal move lists, submitted moves, JSON on the wire) carries a
//! [`PieceSnapshot`] instead: a plain value with no link back to the board.
//! A [`MoveDescriptor`] can only hold snapshots, so an in-flight move can never
//! mutate live board state by accident.

use crate::error::{ChessEngineError, ChessEngineResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Side of the board a piece belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
    White,
    Black,
}

impl Team {
    pub const ALL: [Team; 2] = [Team::White, Team::Black];

    /// The other team
    pub fn opponent(self) -> Team {
        match self {
            Team::White => Team::Black,
            Team::Black => Team::White,
        }
    }

    /// Row delta of a single pawn step
    pub fn forward(self) -> i8 {
        match self {
            Team::White => 1,
            Team::Black => -1,
        }
    }

    /// Row holding this team's major pieces at setup
    pub fn back_row(self) -> i8 {
        match self {
            Team::White => 0,
            Team::Black => 7,
        }
    }

    /// Row holding this team's pawns at setup
    pub fn pawn_row(self) -> i8 {
        self.back_row() + self.forward()
    }

    /// Row on which this team's pawns promote
    pub fn promotion_row(self) -> i8 {
        self.opponent().back_row()
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Team::White => 0,
            Team::Black => 1,
        }
    }

    fn letter(self) -> char {
        match self {
            Team::White => 'W',
            Team::Black => 'B',
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Team::White => write!(f, "White"),
            Team::Black => write!(f, "Black"),
        }
    }
}

/// Kind of piece. Only a pawn's type ever changes (promotion).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PieceType {
    Pawn,
    Rook,
    Bishop,
    Knight,
    King,
    Queen,
}

impl PieceType {
    /// Types a pawn may promote to
    pub const PROMOTIONS: [PieceType; 4] = [
        PieceType::Rook,
        PieceType::Bishop,
        PieceType::Knight,
        PieceType::Queen,
    ];

    /// Single-letter symbol, uppercase
    pub fn symbol(self) -> char {
        match self {
            PieceType::Pawn => 'P',
            PieceType::Rook => 'R',
            PieceType::Bishop => 'B',
            PieceType::Knight => 'N',
            PieceType::King => 'K',
            PieceType::Queen => 'Q',
        }
    }

    /// Parse a promotion suffix such as `q` or `N`
    pub fn from_promotion_char(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'r' => Some(PieceType::Rook),
            'b' => Some(PieceType::Bishop),
            'n' => Some(PieceType::Knight),
            'q' => Some(PieceType::Queen),
            _ => None,
        }
    }
}

/// Board square as `(row, col)`, both 0-7
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Coordinate {
    pub row: i8,
    pub col: i8,
}

impl Coordinate {
    /// Create a coordinate, rejecting anything off the board
    pub fn new(row: i8, col: i8) -> ChessEngineResult<Self> {
        if Self::in_bounds(row, col) {
            Ok(Coordinate { row, col })
        } else {
            Err(ChessEngineError::InvalidCoordinate { row, col })
        }
    }

    #[inline]
    pub fn in_bounds(row: i8, col: i8) -> bool {
        (0..8).contains(&row) && (0..8).contains(&col)
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        Self::in_bounds(self.row, self.col)
    }

    /// Step by a vector, `None` when the result leaves the board
    #[inline]
    pub fn offset(self, v: Vector) -> Option<Coordinate> {
        let row = self.row + v.d_row;
        let col = self.col + v.d_col;
        Self::in_bounds(row, col).then_some(Coordinate { row, col })
    }

    /// Parse algebraic notation such as `"e4"`
    ///
    /// # Examples
    ///
    /// ```rust
    /// use chess_engine::Coordinate;
    /// let e4 = Coordinate::from_algebraic("e4").unwrap();
    /// assert_eq!((e4.row, e4.col), (3, 4));
    /// ```
    pub fn from_algebraic(s: &str) -> Option<Self> {
        let mut chars = s.chars();
        let file = chars.next()?;
        let rank = chars.next()?;
        if chars.next().is_some() || !('a'..='h').contains(&file) {
            return None;
        }
        let rank = rank.to_digit(10)?;
        if !(1..=8).contains(&rank) {
            return None;
        }
        Some(Coordinate {
            row: rank as i8 - 1,
            col: (file as u8 - b'a') as i8,
        })
    }

    /// Square name such as `e4`; `None` off the board
    pub fn to_algebraic(self) -> Option<String> {
        if !self.is_valid() {
            return None;
        }
        Some(format!("{}{}", (b'a' + self.col as u8) as char, self.row + 1))
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_algebraic() {
            Some(name) => f.write_str(&name),
            None => write!(f, "({}, {})", self.row, self.col),
        }
    }
}

/// Direction vector in `(row, col)` space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Vector {
    pub d_row: i8,
    pub d_col: i8,
}

impl Vector {
    pub const fn new(d_row: i8, d_col: i8) -> Self {
        Vector { d_row, d_col }
    }

    #[inline]
    pub fn scaled(self, n: i8) -> Vector {
        Vector::new(self.d_row * n, self.d_col * n)
    }

    #[inline]
    pub fn is_diagonal(self) -> bool {
        self.d_row != 0 && self.d_col != 0
    }
}

/// Stable piece identity, unique per starting square
///
/// IDs are derived from team and starting square (`"W-e1"`, `"B-g8"`), so the
/// same setup always yields the same IDs on both clients and the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PieceId(String);

impl PieceId {
    pub fn for_start(team: Team, square: Coordinate) -> Self {
        PieceId(format!("{}-{}", team.letter(), square))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PieceId {
    fn from(value: &str) -> Self {
        PieceId(value.to_string())
    }
}

impl fmt::Display for PieceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Value copy of a piece's state at one instant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PieceSnapshot {
    pub id: PieceId,
    pub kind: PieceType,
    pub team: Team,
    pub location: Coordinate,
    pub move_count: u32,
    pub en_passant_vulnerable: bool,
    pub captured: bool,
}

/// What happens to the second piece involved in a move
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecondaryMove {
    pub piece: PieceSnapshot,
    /// `None` removes the piece from the board (capture), `Some` relocates it (castling rook)
    pub destination: Option<Coordinate>,
}

/// Immutable description of one move transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MoveDescriptor {
    pub piece: PieceSnapshot,
    pub destination: Coordinate,
    pub secondary: Option<SecondaryMove>,
    pub capturing: bool,
    pub castling: bool,
    /// Set on a pawn double step: the pawn becomes en-passant vulnerable
    pub en_passant_vulnerable: bool,
    pub promotion: Option<PieceType>,
}

impl MoveDescriptor {
    pub fn team(&self) -> Team {
        self.piece.team
    }

    pub fn origin(&self) -> Coordinate {
        self.piece.location
    }

    /// Whether this descriptor names the same transaction as `(piece, destination, promotion)`
    pub fn matches(&self, piece: &PieceId, destination: Coordinate, promotion: Option<PieceType>) -> bool {
        self.piece.id == *piece && self.destination == destination && self.promotion == promotion
    }

    /// Coordinate notation such as `e2e4` or `e7e8q`
    pub fn notation(&self) -> String {
        let mut out = format!("{}{}", self.origin(), self.destination);
        if let Some(kind) = self.promotion {
            out.push(kind.symbol().to_ascii_lowercase());
        }
        out
    }
}

/// Outcome of a match from the local player's point of view
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchState {
    #[default]
    Playing,
    LocalWin,
    LocalLoss,
    Draw,
    OpponentDisconnected,
    ServerUnavailable,
}

impl MatchState {
    /// Every state other than `Playing` is terminal
    pub fn is_terminal(self) -> bool {
        !matches!(self, MatchState::Playing)
    }

    pub fn message(self) -> &'static str {
        match self {
            MatchState::Playing => "Game in progress",
            MatchState::LocalWin => "You win by checkmate!",
            MatchState::LocalLoss => "You lose by checkmate",
            MatchState::Draw => "Draw",
            MatchState::OpponentDisconnected => "Opponent disconnected",
            MatchState::ServerUnavailable => "Server unavailable",
        }
    }
}
