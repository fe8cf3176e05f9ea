//! # Move Generation
//!
//! Produces the legal moves of a single piece in two stages:
//!
//! 1. **Pseudo-legal generation** from the piece's vector table
//!    ([`vectors::direction_vectors`]): sliding for rooks, bishops and queens,
//!    single steps for kings and knights, the pawn special cases in [`pawn`]
//!    and castling in [`king`].
//! 2. **Check filter**: each candidate is applied to the board, the mover's
//!    king is tested with [`crate::attack::is_in_check`], and the move is
//!    undone. Candidates that leave the king attacked are dropped.
//!
//! The check filter is where almost all generation time goes. It must not be
//! skipped: every move handed to a caller survives it.
//!
//! ## Recursion
//!
//! Castling path probes use the plain check query, never full legal-move
//! generation, so generating king moves can't recurse into itself.

pub mod king;
pub mod pawn;
pub mod sliding;
pub mod vectors;

use crate::attack::is_in_check;
use crate::board::{Board, Piece};
use crate::error::ChessEngineResult;
use crate::types::*;

/// Legal moves for the piece with `id`
///
/// Returns an empty list for a captured piece.
///
/// # Errors
///
/// [`crate::ChessEngineError::UnknownPiece`] if the ID is not on this board.
/// Other errors indicate a corrupted board.
///
/// # Examples
///
/// ```rust
/// use chess_engine::{move_gen, Board, PieceId};
/// let mut board = Board::standard();
/// let moves = move_gen::legal_moves(&mut board, &PieceId::from("W-g1")).unwrap();
/// assert_eq!(moves.len(), 2); // Nf3, Nh3
/// ```
pub fn legal_moves(board: &mut Board, id: &PieceId) -> ChessEngineResult<Vec<MoveDescriptor>> {
    let idx = board.index_of(id)?;
    legal_moves_for_index(board, idx)
}

/// Legal moves for every on-board piece of `team`
pub fn all_legal_moves(board: &mut Board, team: Team) -> ChessEngineResult<Vec<MoveDescriptor>> {
    let mut moves = Vec::new();
    for idx in board.team_indices(team) {
        moves.extend(legal_moves_for_index(board, idx)?);
    }
    Ok(moves)
}

/// Whether `team` has at least one legal move. Stops at the first one found.
pub fn has_any_legal_move(board: &mut Board, team: Team) -> ChessEngineResult<bool> {
    for idx in board.team_indices(team) {
        for mv in pseudo_legal_moves(board, idx)? {
            if !leaves_king_in_check(board, &mv, team)? {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

/// Moves that obey movement rules, before the check filter
pub fn pseudo_legal_moves(board: &mut Board, idx: usize) -> ChessEngineResult<Vec<MoveDescriptor>> {
    let piece = board.piece_by_index(idx);
    if piece.is_captured() {
        return Ok(Vec::new());
    }

    let mut moves = Vec::new();
    let kind = piece.kind();
    if kind == PieceType::Pawn {
        pawn::generate_pawn_moves(board, piece, &mut moves);
        return Ok(moves);
    }

    let reach = if vectors::slides(kind) { 7 } else { 1 };
    let vectors = vectors::direction_vectors(kind, piece.team());
    sliding::generate_ray_moves(board, piece, vectors, reach, &mut moves);
    if kind == PieceType::King {
        king::generate_castling_moves(board, idx, &mut moves)?;
    }
    Ok(moves)
}

fn legal_moves_for_index(board: &mut Board, idx: usize) -> ChessEngineResult<Vec<MoveDescriptor>> {
    let team = board.piece_by_index(idx).team();
    let candidates = pseudo_legal_moves(board, idx)?;

    let mut legal = Vec::with_capacity(candidates.len());
    for mv in candidates {
        if !leaves_king_in_check(board, &mv, team)? {
            legal.push(mv);
        }
    }
    Ok(legal)
}

/// Apply `mv`, test `team`'s king, undo
fn leaves_king_in_check(board: &mut Board, mv: &MoveDescriptor, team: Team) -> ChessEngineResult<bool> {
    let record = board.apply(mv)?;
    let in_check = is_in_check(board, team);
    board.undo(record)?;
    Ok(in_check)
}

/// Descriptor for a move onto an empty square
pub(crate) fn quiet(piece: &Piece, destination: Coordinate) -> MoveDescriptor {
    MoveDescriptor {
        piece: piece.snapshot(),
        destination,
        secondary: None,
        capturing: false,
        castling: false,
        en_passant_vulnerable: false,
        promotion: None,
    }
}

/// Descriptor for a move that removes `victim` from wherever it stands
pub(crate) fn capture(piece: &Piece, destination: Coordinate, victim: &Piece) -> MoveDescriptor {
    MoveDescriptor {
        capturing: true,
        secondary: Some(SecondaryMove {
            piece: victim.snapshot(),
            destination: None,
        }),
        ..quiet(piece, destination)
    }
}

#[cfg(test)]
mod tests;
