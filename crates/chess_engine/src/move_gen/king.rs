//! King move generation
//!
//! Kings step one square along any of the 8 unit vectors (handled by the shared
//! ray walker with a distance of one). This module adds castling, which needs
//! board probes and so takes the board mutably.
//!
//! ## Castling Conditions
//!
//! For each castling pseudo-vector (two squares along the row):
//! - the king has never moved
//! - the first piece found walking from the king toward that edge is a friendly
//!   rook that has never moved (so every square strictly between is empty)
//! - the king is not currently in check
//! - neither the square the king crosses nor the square it lands on is attacked,
//!   tested by moving only the king there, asking the single check query, and
//!   undoing
//!
//! The emitted move carries the rook as its secondary piece, destined for the
//! square the king crossed.

use super::quiet;
use super::vectors::CASTLING_VECTORS;
use crate::attack::is_in_check;
use crate::board::Board;
use crate::error::ChessEngineResult;
use crate::types::*;

/// Generate castling moves for the king at arena index `king_idx`
pub fn generate_castling_moves(
    board: &mut Board,
    king_idx: usize,
    moves: &mut Vec<MoveDescriptor>,
) -> ChessEngineResult<()> {
    let king = board.piece_by_index(king_idx).clone();
    if king.move_count() != 0 || is_in_check(board, king.team()) {
        return Ok(());
    }

    for vector in CASTLING_VECTORS {
        let step = Vector::new(0, vector.d_col.signum());
        let Some(rook) = first_piece_toward_edge(board, king.location(), step) else {
            continue;
        };
        if rook.team != king.team() || rook.kind != PieceType::Rook || rook.move_count != 0 {
            continue;
        }

        let (Some(crossed), Some(landing)) = (
            king.location().offset(step),
            king.location().offset(vector),
        ) else {
            continue;
        };
        // The rook must sit beyond the landing square for both to be empty.
        if !board.is_empty(crossed) || !board.is_empty(landing) {
            continue;
        }

        if king_attacked_on(board, &king.snapshot(), crossed)?
            || king_attacked_on(board, &king.snapshot(), landing)?
        {
            continue;
        }

        let mut mv = quiet(&king, landing);
        mv.castling = true;
        mv.secondary = Some(SecondaryMove {
            piece: rook,
            destination: Some(crossed),
        });
        moves.push(mv);
    }

    Ok(())
}

fn first_piece_toward_edge(board: &Board, from: Coordinate, step: Vector) -> Option<PieceSnapshot> {
    let mut square = from.offset(step)?;
    loop {
        if let Some(piece) = board.piece_at(square) {
            return Some(piece.snapshot());
        }
        square = square.offset(step)?;
    }
}

/// Move only the king to `square`, query check, and revert
fn king_attacked_on(board: &mut Board, king: &PieceSnapshot, square: Coordinate) -> ChessEngineResult<bool> {
    let probe = MoveDescriptor {
        piece: king.clone(),
        destination: square,
        secondary: None,
        capturing: false,
        castling: false,
        en_passant_vulnerable: false,
        promotion: None,
    };
    let record = board.apply(&probe)?;
    let attacked = is_in_check(board, king.team);
    board.undo(record)?;
    Ok(attacked)
}
