//! Make/unmake for move descriptors
//!
//! `apply` executes a [`MoveDescriptor`] against the live board and returns the
//! [`UndoRecord`] that is the only way to revert it. Handing the record back to
//! the caller keeps apply/undo pairs strictly LIFO: the check filter applies,
//! probes and undoes with the record it was just given, and the game keeps its
//! own stack of records for public history.
//!
//! Both directions validate before touching the grid, so an invariant violation
//! (stale descriptor, occupied destination, counter underflow) leaves the board
//! exactly as it was.

use crate::board::Board;
use crate::error::{ChessEngineError, ChessEngineResult};
use crate::types::*;

/// Prior state of every piece a move touched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoRecord {
    main: PieceSnapshot,
    secondary: Option<PieceSnapshot>,
    capture: bool,
}

impl UndoRecord {
    /// Whether the move removed a piece from the board
    pub fn was_capture(&self) -> bool {
        self.capture
    }

    /// The moving piece as it was before the move
    pub fn piece(&self) -> &PieceSnapshot {
        &self.main
    }
}

impl Board {
    /// Execute a move descriptor
    ///
    /// The secondary piece is handled first: a captured piece is marked captured
    /// and leaves the grid, a castling rook relocates and its move counter
    /// increments. Then the main piece moves, its counter increments, its
    /// en-passant flag is set from the descriptor and its type changes if the
    /// move promotes.
    ///
    /// # Errors
    ///
    /// - [`ChessEngineError::UnknownPiece`] if a referenced ID is not on this board
    /// - [`ChessEngineError::StalePiece`] if a snapshot disagrees with the live piece
    /// - [`ChessEngineError::SquareOccupied`] if a destination is taken
    pub fn apply(&mut self, mv: &MoveDescriptor) -> ChessEngineResult<UndoRecord> {
        let main_idx = self.index_of(&mv.piece.id)?;
        self.ensure_in_place(main_idx, &mv.piece)?;

        let mut leaving = Vec::new();
        let secondary_idx = match &mv.secondary {
            Some(secondary) => {
                let idx = self.index_of(&secondary.piece.id)?;
                if idx == main_idx {
                    return Err(ChessEngineError::StalePiece {
                        piece: secondary.piece.id.clone(),
                        expected: secondary.piece.location,
                    });
                }
                self.ensure_in_place(idx, &secondary.piece)?;
                if let Some(dest) = secondary.destination {
                    self.ensure_free(dest, &[])?;
                    if dest == mv.destination {
                        return Err(ChessEngineError::SquareOccupied { square: dest });
                    }
                }
                leaving.push(idx);
                Some(idx)
            }
            None => None,
        };
        self.ensure_free(mv.destination, &leaving)?;

        let capture = mv.secondary.as_ref().is_some_and(|s| s.destination.is_none());
        let record = UndoRecord {
            main: self.piece_by_index(main_idx).snapshot(),
            secondary: secondary_idx.map(|idx| self.piece_by_index(idx).snapshot()),
            capture,
        };

        if let (Some(idx), Some(secondary)) = (secondary_idx, &mv.secondary) {
            let from = self.piece_by_index(idx).location;
            self.vacate(from);
            match secondary.destination {
                None => self.piece_mut(idx).captured = true,
                Some(dest) => {
                    self.occupy(dest, idx)?;
                    let partner = self.piece_mut(idx);
                    partner.location = dest;
                    partner.move_count += 1;
                }
            }
        }

        let from = self.piece_by_index(main_idx).location;
        self.vacate(from);
        self.occupy(mv.destination, main_idx)?;
        let piece = self.piece_mut(main_idx);
        piece.location = mv.destination;
        piece.move_count += 1;
        piece.en_passant_vulnerable = mv.en_passant_vulnerable;
        if let Some(kind) = mv.promotion {
            piece.kind = kind;
        }

        Ok(record)
    }

    /// Exact inverse of [`Board::apply`]
    ///
    /// # Errors
    ///
    /// - [`ChessEngineError::MoveCounterUnderflow`] if a moved piece's counter is already zero
    /// - [`ChessEngineError::SquareOccupied`] if a prior square has been taken since
    pub fn undo(&mut self, record: UndoRecord) -> ChessEngineResult<()> {
        let main_idx = self.index_of(&record.main.id)?;
        if self.piece_by_index(main_idx).move_count == 0 {
            return Err(ChessEngineError::MoveCounterUnderflow {
                piece: record.main.id.clone(),
            });
        }

        let secondary_idx = match &record.secondary {
            Some(snapshot) => {
                let idx = self.index_of(&snapshot.id)?;
                if !record.capture && self.piece_by_index(idx).move_count == 0 {
                    return Err(ChessEngineError::MoveCounterUnderflow {
                        piece: snapshot.id.clone(),
                    });
                }
                Some(idx)
            }
            None => None,
        };

        let mut leaving = vec![main_idx];
        leaving.extend(secondary_idx);
        self.ensure_free(record.main.location, &leaving)?;
        if let Some(snapshot) = &record.secondary {
            self.ensure_free(snapshot.location, &leaving)?;
        }

        let current = self.piece_by_index(main_idx).location;
        self.vacate(current);
        if let Some(idx) = secondary_idx {
            if !record.capture {
                let at = self.piece_by_index(idx).location;
                self.vacate(at);
            }
        }

        self.piece_mut(main_idx).restore(&record.main);
        self.occupy(record.main.location, main_idx)?;

        if let (Some(idx), Some(snapshot)) = (secondary_idx, &record.secondary) {
            self.piece_mut(idx).restore(snapshot);
            self.occupy(snapshot.location, idx)?;
        }

        Ok(())
    }

    fn ensure_in_place(&self, idx: usize, snapshot: &PieceSnapshot) -> ChessEngineResult<()> {
        let live = self.piece_by_index(idx);
        if live.captured || live.location != snapshot.location || live.team != snapshot.team {
            return Err(ChessEngineError::StalePiece {
                piece: snapshot.id.clone(),
                expected: snapshot.location,
            });
        }
        Ok(())
    }

    /// `square` must be on the board and empty, or held by one of the `leaving` pieces
    fn ensure_free(&self, square: Coordinate, leaving: &[usize]) -> ChessEngineResult<()> {
        if !square.is_valid() {
            return Err(ChessEngineError::InvalidCoordinate {
                row: square.row,
                col: square.col,
            });
        }
        match self.index_at(square) {
            Some(idx) if !leaving.contains(&idx) => Err(ChessEngineError::SquareOccupied { square }),
            _ => Ok(()),
        }
    }
}
