//! Board model
//!
//! Provides the piece arena and the 8x8 occupancy grid used throughout the engine:
//! - Standard and custom setups
//! - Square and piece-ID queries
//! - Low-level placement primitives that enforce the one-piece-per-cell invariant
//!
//! ## Ownership
//!
//! `Board` exclusively owns every [`Piece`] in a `Vec` arena. The grid stores
//! `Option<usize>` indices into that arena, never the pieces themselves, and the
//! two king indices are fixed at setup. Captured pieces stay in the arena with
//! their `captured` flag set so that undo can restore them.

use crate::error::{ChessEngineError, ChessEngineResult};
use crate::types::*;
use std::fmt;

const BACK_RANK: [PieceType; 8] = [
    PieceType::Rook,
    PieceType::Knight,
    PieceType::Bishop,
    PieceType::Queen,
    PieceType::King,
    PieceType::Bishop,
    PieceType::Knight,
    PieceType::Rook,
];

/// A live, board-owned piece
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Piece {
    pub(crate) id: PieceId,
    pub(crate) kind: PieceType,
    pub(crate) team: Team,
    pub(crate) location: Coordinate,
    pub(crate) move_count: u32,
    pub(crate) en_passant_vulnerable: bool,
    pub(crate) captured: bool,
}

impl Piece {
    fn new(team: Team, kind: PieceType, location: Coordinate) -> Self {
        Piece {
            id: PieceId::for_start(team, location),
            kind,
            team,
            location,
            move_count: 0,
            en_passant_vulnerable: false,
            captured: false,
        }
    }

    pub fn id(&self) -> &PieceId {
        &self.id
    }

    pub fn kind(&self) -> PieceType {
        self.kind
    }

    pub fn team(&self) -> Team {
        self.team
    }

    pub fn location(&self) -> Coordinate {
        self.location
    }

    pub fn move_count(&self) -> u32 {
        self.move_count
    }

    pub fn is_en_passant_vulnerable(&self) -> bool {
        self.kind == PieceType::Pawn && self.en_passant_vulnerable
    }

    pub fn is_captured(&self) -> bool {
        self.captured
    }

    /// Detached value copy for move descriptors and the wire
    pub fn snapshot(&self) -> PieceSnapshot {
        PieceSnapshot {
            id: self.id.clone(),
            kind: self.kind,
            team: self.team,
            location: self.location,
            move_count: self.move_count,
            en_passant_vulnerable: self.en_passant_vulnerable,
            captured: self.captured,
        }
    }

    /// Overwrite mutable state from a snapshot of the same piece
    pub(crate) fn restore(&mut self, snapshot: &PieceSnapshot) {
        self.kind = snapshot.kind;
        self.location = snapshot.location;
        self.move_count = snapshot.move_count;
        self.en_passant_vulnerable = snapshot.en_passant_vulnerable;
        self.captured = snapshot.captured;
    }
}

/// 8x8 board with an owning piece arena
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    pieces: Vec<Piece>,
    grid: [[Option<usize>; 8]; 8],
    kings: [usize; 2],
}

impl Board {
    /// Standard starting position
    pub fn standard() -> Self {
        let mut placements = Vec::with_capacity(32);
        for team in Team::ALL {
            for (col, kind) in BACK_RANK.iter().enumerate() {
                placements.push((team, *kind, Coordinate { row: team.back_row(), col: col as i8 }));
                placements.push((
                    team,
                    PieceType::Pawn,
                    Coordinate { row: team.pawn_row(), col: col as i8 },
                ));
            }
        }
        // The standard setup is always well formed.
        match Self::from_placements(&placements) {
            Ok(board) => board,
            Err(e) => unreachable!("standard setup rejected: {e}"),
        }
    }

    /// Build a custom position. Every piece starts unmoved.
    ///
    /// # Errors
    ///
    /// - [`ChessEngineError::SquareOccupied`] if two placements share a square
    /// - [`ChessEngineError::InvalidCoordinate`] for off-board squares
    /// - [`ChessEngineError::InvalidSetup`] unless each team has exactly one king
    ///
    /// # Examples
    ///
    /// ```rust
    /// use chess_engine::{Board, Coordinate, PieceType, Team};
    /// let sq = |s| Coordinate::from_algebraic(s).unwrap();
    /// let board = Board::from_placements(&[
    ///     (Team::White, PieceType::King, sq("e1")),
    ///     (Team::Black, PieceType::King, sq("e8")),
    /// ]).unwrap();
    /// assert_eq!(board.remaining_pieces(), 2);
    /// ```
    pub fn from_placements(placements: &[(Team, PieceType, Coordinate)]) -> ChessEngineResult<Self> {
        let mut board = Board {
            pieces: Vec::with_capacity(placements.len()),
            grid: [[None; 8]; 8],
            kings: [usize::MAX; 2],
        };

        for &(team, kind, square) in placements {
            Coordinate::new(square.row, square.col)?;
            let idx = board.pieces.len();
            board.occupy(square, idx)?;
            board.pieces.push(Piece::new(team, kind, square));

            if kind == PieceType::King {
                if board.kings[team.index()] != usize::MAX {
                    return Err(ChessEngineError::InvalidSetup {
                        message: format!("{team} has more than one king"),
                    });
                }
                board.kings[team.index()] = idx;
            }
        }

        for team in Team::ALL {
            if board.kings[team.index()] == usize::MAX {
                return Err(ChessEngineError::InvalidSetup {
                    message: format!("{team} has no king"),
                });
            }
        }

        Ok(board)
    }

    /// Piece standing on `square`, if any
    pub fn piece_at(&self, square: Coordinate) -> Option<&Piece> {
        self.index_at(square).map(|idx| &self.pieces[idx])
    }

    /// Read-only snapshot accessor for views
    pub fn snapshot_at(&self, square: Coordinate) -> Option<PieceSnapshot> {
        self.piece_at(square).map(Piece::snapshot)
    }

    pub fn is_empty(&self, square: Coordinate) -> bool {
        self.index_at(square).is_none()
    }

    /// Look up a piece by ID, captured pieces included
    pub fn piece(&self, id: &PieceId) -> Option<&Piece> {
        self.pieces.iter().find(|p| p.id == *id)
    }

    /// Pieces still on the board
    pub fn pieces(&self) -> impl Iterator<Item = &Piece> {
        self.pieces.iter().filter(|p| !p.captured)
    }

    /// Pieces of one team still on the board
    pub fn team_pieces(&self, team: Team) -> impl Iterator<Item = &Piece> {
        self.pieces().filter(move |p| p.team == team)
    }

    pub fn king(&self, team: Team) -> &Piece {
        &self.pieces[self.kings[team.index()]]
    }

    pub fn remaining_pieces(&self) -> usize {
        self.pieces().count()
    }

    // ------------------------------------------------------------------------
    // Crate-internal primitives
    // ------------------------------------------------------------------------

    #[inline]
    pub(crate) fn index_at(&self, square: Coordinate) -> Option<usize> {
        if !square.is_valid() {
            return None;
        }
        self.grid[square.row as usize][square.col as usize]
    }

    pub(crate) fn index_of(&self, id: &PieceId) -> ChessEngineResult<usize> {
        self.pieces
            .iter()
            .position(|p| p.id == *id)
            .ok_or_else(|| ChessEngineError::UnknownPiece { piece: id.clone() })
    }

    pub(crate) fn piece_by_index(&self, idx: usize) -> &Piece {
        &self.pieces[idx]
    }

    pub(crate) fn piece_mut(&mut self, idx: usize) -> &mut Piece {
        &mut self.pieces[idx]
    }

    pub(crate) fn king_index(&self, team: Team) -> usize {
        self.kings[team.index()]
    }

    /// Indices of the on-board pieces of `team`
    pub(crate) fn team_indices(&self, team: Team) -> Vec<usize> {
        self.pieces
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.captured && p.team == team)
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Put arena entry `idx` on `square`, which must be empty
    pub(crate) fn occupy(&mut self, square: Coordinate, idx: usize) -> ChessEngineResult<()> {
        if !square.is_valid() {
            return Err(ChessEngineError::InvalidCoordinate {
                row: square.row,
                col: square.col,
            });
        }
        let cell = &mut self.grid[square.row as usize][square.col as usize];
        if cell.is_some() {
            return Err(ChessEngineError::SquareOccupied { square });
        }
        *cell = Some(idx);
        Ok(())
    }

    /// Clear `square`, returning whatever index was there
    pub(crate) fn vacate(&mut self, square: Coordinate) -> Option<usize> {
        if !square.is_valid() {
            return None;
        }
        self.grid[square.row as usize][square.col as usize].take()
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Display for Board {
    /// ASCII diagram, rank 8 at the top. White is uppercase.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in (0..8).rev() {
            write!(f, "{} ", row + 1)?;
            for col in 0..8 {
                let symbol = match self.piece_at(Coordinate { row, col }) {
                    Some(p) if p.team == Team::White => p.kind.symbol(),
                    Some(p) => p.kind.symbol().to_ascii_lowercase(),
                    None => '.',
                };
                write!(f, "{symbol} ")?;
            }
            writeln!(f)?;
        }
        write!(f, "  a b c d e f g h")
    }
}
