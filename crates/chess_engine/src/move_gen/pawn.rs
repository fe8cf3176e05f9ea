//! Pawn move generation
//!
//! Handles pawn-specific move generation including:
//! - Single and double forward pushes
//! - Diagonal captures
//! - En passant
//! - Promotion
//!
//! ## Pawn Movement Rules
//!
//! - **Forward push**: one square toward the opponent, destination must be empty
//! - **Double push**: only from the pawn's starting row while it has never moved,
//!   both squares empty; the generated move marks the pawn en-passant vulnerable
//! - **Captures**: diagonally forward onto an opponent piece
//! - **En passant**: diagonally forward onto an empty square when the square
//!   beside the pawn (same row, destination column) holds a vulnerable enemy pawn;
//!   the captured pawn is removed from its own square, not the destination
//! - **Promotion**: a move landing on the last rank is emitted once per promotion
//!   type (rook, bishop, knight, queen) and never as a plain pawn move

use super::vectors::direction_vectors;
use super::{capture, quiet};
use crate::board::{Board, Piece};
use crate::types::*;

/// Generate pseudo-legal pawn moves
///
/// # Examples
///
/// ```rust,ignore
/// let mut moves = Vec::new();
/// generate_pawn_moves(&board, board.piece_at(e2).unwrap(), &mut moves);
/// // e2-e3 and e2-e4
/// ```
pub fn generate_pawn_moves(board: &Board, pawn: &Piece, moves: &mut Vec<MoveDescriptor>) {
    let from = pawn.location();
    let vectors = direction_vectors(PieceType::Pawn, pawn.team());
    let (single, double, attacks) = (vectors[0], vectors[1], &vectors[2..]);

    if let Some(one) = from.offset(single).filter(|sq| board.is_empty(*sq)) {
        push_with_promotion(pawn, quiet(pawn, one), moves);

        if pawn.move_count() == 0 && from.row == pawn.team().pawn_row() {
            if let Some(two) = from.offset(double).filter(|sq| board.is_empty(*sq)) {
                let mut mv = quiet(pawn, two);
                mv.en_passant_vulnerable = true;
                moves.push(mv);
            }
        }
    }

    for dir in attacks {
        let Some(target) = from.offset(*dir) else {
            continue;
        };
        match board.piece_at(target) {
            Some(victim) if victim.team() != pawn.team() => {
                push_with_promotion(pawn, capture(pawn, target, victim), moves);
            }
            Some(_) => {}
            None => {
                let beside = Coordinate {
                    row: from.row,
                    col: target.col,
                };
                if let Some(victim) = board.piece_at(beside) {
                    if victim.team() != pawn.team() && victim.is_en_passant_vulnerable() {
                        moves.push(capture(pawn, target, victim));
                    }
                }
            }
        }
    }
}

fn push_with_promotion(pawn: &Piece, mv: MoveDescriptor, moves: &mut Vec<MoveDescriptor>) {
    if mv.destination.row != pawn.team().promotion_row() {
        moves.push(mv);
        return;
    }
    for kind in PieceType::PROMOTIONS {
        let mut promoted = mv.clone();
        promoted.promotion = Some(kind);
        moves.push(promoted);
    }
}
