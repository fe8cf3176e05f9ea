//! Attack detection and check queries
//!
//! Decides whether a team's king is in check by looking outward from the king
//! rather than generating every opponent move.
//!
//! ## Algorithm
//!
//! From the king's square, walk each of the 8 rays up to 7 squares. The first
//! occupied square on a ray is the only candidate attacker on that ray:
//! - rook or queen on an orthogonal ray
//! - bishop or queen on a diagonal ray
//! - king at distance 1
//! - pawn at distance 1 on a diagonal ray, and only from the side it attacks
//!   toward (a White pawn attacks the next row up, so it threatens a Black king
//!   from one row below; a Black pawn threatens a White king from one row above)
//!
//! Knights are tested separately on the 8 fixed L-offsets.
//!
//! This query never generates moves, so it is safe to call from inside move
//! generation (castling path probes) without recursion.

use crate::board::Board;
use crate::move_gen::vectors::{KNIGHT_OFFSETS, ROYAL_VECTORS};
use crate::types::*;

/// Whether `team`'s king is attacked on the current board
///
/// # Examples
///
/// ```rust
/// use chess_engine::{attack, Board, Team};
/// let board = Board::standard();
/// assert!(!attack::is_in_check(&board, Team::White));
/// ```
pub fn is_in_check(board: &Board, team: Team) -> bool {
    is_square_attacked(board, board.king(team).location(), team.opponent())
}

/// Whether any piece of `by` attacks `square`
pub fn is_square_attacked(board: &Board, square: Coordinate, by: Team) -> bool {
    for dir in ROYAL_VECTORS {
        for distance in 1..8 {
            let Some(target) = square.offset(dir.scaled(distance)) else {
                break;
            };
            let Some(piece) = board.piece_at(target) else {
                continue;
            };
            if piece.team() == by && attacks_along(piece.kind(), by, dir, distance) {
                return true;
            }
            break;
        }
    }

    KNIGHT_OFFSETS.iter().any(|offset| {
        square
            .offset(*offset)
            .and_then(|target| board.piece_at(target))
            .is_some_and(|p| p.team() == by && p.kind() == PieceType::Knight)
    })
}

/// Can a piece of `kind`/`team`, found `distance` steps from the target along
/// `dir` (pointing from the target toward the piece), attack the target?
fn attacks_along(kind: PieceType, team: Team, dir: Vector, distance: i8) -> bool {
    match kind {
        PieceType::Queen => true,
        PieceType::Rook => !dir.is_diagonal(),
        PieceType::Bishop => dir.is_diagonal(),
        PieceType::King => distance == 1,
        // The pawn steps opposite to `dir` to reach the target, so its forward
        // direction must equal -dir.d_row.
        PieceType::Pawn => distance == 1 && dir.is_diagonal() && dir.d_row == -team.forward(),
        PieceType::Knight => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(s: &str) -> Coordinate {
        Coordinate::from_algebraic(s).unwrap()
    }

    fn board(extra: &[(Team, PieceType, &str)]) -> Board {
        let mut placements = vec![
            (Team::White, PieceType::King, sq("e1")),
            (Team::Black, PieceType::King, sq("h8")),
        ];
        placements.extend(extra.iter().map(|&(t, k, s)| (t, k, sq(s))));
        Board::from_placements(&placements).unwrap()
    }

    #[test]
    fn test_rook_checks_on_open_file() {
        let b = board(&[(Team::Black, PieceType::Rook, "e7")]);
        assert!(is_in_check(&b, Team::White));
    }

    #[test]
    fn test_rook_blocked_by_any_piece() {
        let b = board(&[
            (Team::Black, PieceType::Rook, "e7"),
            (Team::Black, PieceType::Pawn, "e4"),
        ]);
        assert!(!is_in_check(&b, Team::White));
    }

    #[test]
    fn test_rook_does_not_attack_diagonally() {
        let b = board(&[(Team::Black, PieceType::Rook, "c3")]);
        assert!(!is_in_check(&b, Team::White));
    }

    #[test]
    fn test_bishop_and_queen_diagonals() {
        assert!(is_in_check(&board(&[(Team::Black, PieceType::Bishop, "a5")]), Team::White));
        assert!(is_in_check(&board(&[(Team::Black, PieceType::Queen, "b4")]), Team::White));
        assert!(!is_in_check(&board(&[(Team::Black, PieceType::Bishop, "e5")]), Team::White));
    }

    #[test]
    fn test_pawn_attack_direction_is_not_symmetric() {
        // Black pawn on d2 attacks e1 (it captures downward).
        assert!(is_in_check(&board(&[(Team::Black, PieceType::Pawn, "d2")]), Team::White));

        // A black king on d5 is attacked by a white pawn on c4 but not by one on c6.
        let attacked = Board::from_placements(&[
            (Team::White, PieceType::King, sq("a1")),
            (Team::Black, PieceType::King, sq("d5")),
            (Team::White, PieceType::Pawn, sq("c4")),
        ])
        .unwrap();
        assert!(is_in_check(&attacked, Team::Black));

        let behind = Board::from_placements(&[
            (Team::White, PieceType::King, sq("a1")),
            (Team::Black, PieceType::King, sq("d5")),
            (Team::White, PieceType::Pawn, sq("c6")),
        ])
        .unwrap();
        assert!(!is_in_check(&behind, Team::Black));
    }

    #[test]
    fn test_pawn_does_not_attack_straight_ahead() {
        assert!(!is_in_check(&board(&[(Team::Black, PieceType::Pawn, "e2")]), Team::White));
    }

    #[test]
    fn test_knight_check() {
        assert!(is_in_check(&board(&[(Team::Black, PieceType::Knight, "f3")]), Team::White));
        assert!(!is_in_check(&board(&[(Team::Black, PieceType::Knight, "e3")]), Team::White));
    }

    #[test]
    fn test_king_only_adjacent() {
        let adjacent = Board::from_placements(&[
            (Team::White, PieceType::King, sq("e1")),
            (Team::Black, PieceType::King, sq("e2")),
        ])
        .unwrap();
        assert!(is_in_check(&adjacent, Team::White));
        assert!(!is_in_check(&board(&[]), Team::White));
    }

    #[test]
    fn test_friendly_pieces_never_attack() {
        let b = board(&[(Team::White, PieceType::Queen, "e5")]);
        assert!(!is_in_check(&b, Team::White));
    }

    #[test]
    fn test_check_query_is_idempotent() {
        let b = board(&[(Team::Black, PieceType::Queen, "a5")]);
        let first = is_in_check(&b, Team::White);
        let second = is_in_check(&b, Team::White);
        assert_eq!(first, second);
        assert!(first);
    }
}
