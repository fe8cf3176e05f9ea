//! Sliding and stepping piece move generation
//!
//! Common functionality for pieces whose moves are fully described by their
//! vector table: rooks, bishops and queens slide; kings step once.
//!
//! ## Algorithm
//!
//! For each vector, walk multiples 1..=7 from the current square:
//! 1. Empty square: quiet move, keep walking
//! 2. Opponent piece: capture, stop this direction
//! 3. Own piece or board edge: stop this direction
//!
//! Stepping pieces use the same loop with a maximum distance of one.

use super::{capture, quiet};
use crate::board::{Board, Piece};
use crate::types::*;

/// Generate moves along `vectors` up to `max_distance` squares
pub fn generate_ray_moves(
    board: &Board,
    piece: &Piece,
    vectors: &[Vector],
    max_distance: i8,
    moves: &mut Vec<MoveDescriptor>,
) {
    let from = piece.location();

    for dir in vectors {
        for distance in 1..=max_distance {
            let Some(target) = from.offset(dir.scaled(distance)) else {
                break;
            };
            match board.piece_at(target) {
                None => moves.push(quiet(piece, target)),
                Some(other) if other.team() != piece.team() => {
                    moves.push(capture(piece, target, other));
                    break;
                }
                Some(_) => break,
            }
        }
    }
}
