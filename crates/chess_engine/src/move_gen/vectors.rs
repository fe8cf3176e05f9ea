//! Direction vector tables
//!
//! Every piece type's movement directions are fixed tables, looked up by
//! `(type, team)` each time moves are generated. A promoted pawn therefore
//! picks up its new type's table on the very next generation with no stale
//! cache to invalidate.
//!
//! | Piece  | Vectors |
//! |--------|---------|
//! | Queen  | 8 unit vectors, slid up to 7 squares |
//! | King   | 8 unit vectors, one square, plus the two castling pseudo-vectors |
//! | Rook   | 4 orthogonal unit vectors, slid |
//! | Bishop | 4 diagonal unit vectors, slid |
//! | Pawn   | forward, double forward, two forward diagonals (team dependent) |
//! | Knight | 8 L-shaped offsets, independent of team and history |

use crate::types::{PieceType, Team, Vector};

pub const ORTHOGONAL: [Vector; 4] = [
    Vector::new(1, 0),
    Vector::new(-1, 0),
    Vector::new(0, 1),
    Vector::new(0, -1),
];

pub const DIAGONAL: [Vector; 4] = [
    Vector::new(1, 1),
    Vector::new(1, -1),
    Vector::new(-1, 1),
    Vector::new(-1, -1),
];

/// Orthogonal followed by diagonal unit vectors (queen and king)
pub const ROYAL_VECTORS: [Vector; 8] = [
    ORTHOGONAL[0],
    ORTHOGONAL[1],
    ORTHOGONAL[2],
    ORTHOGONAL[3],
    DIAGONAL[0],
    DIAGONAL[1],
    DIAGONAL[2],
    DIAGONAL[3],
];

pub const KNIGHT_OFFSETS: [Vector; 8] = [
    Vector::new(2, 1),
    Vector::new(2, -1),
    Vector::new(-2, 1),
    Vector::new(-2, -1),
    Vector::new(1, 2),
    Vector::new(1, -2),
    Vector::new(-1, 2),
    Vector::new(-1, -2),
];

/// King-side first, then queen-side
pub const CASTLING_VECTORS: [Vector; 2] = [Vector::new(0, 2), Vector::new(0, -2)];

const WHITE_PAWN: [Vector; 4] = [
    Vector::new(1, 0),
    Vector::new(2, 0),
    Vector::new(1, -1),
    Vector::new(1, 1),
];

const BLACK_PAWN: [Vector; 4] = [
    Vector::new(-1, 0),
    Vector::new(-2, 0),
    Vector::new(-1, -1),
    Vector::new(-1, 1),
];

/// Movement vectors for a piece type
///
/// Pawn tables list the single step, the double step, then the two attack
/// diagonals. Callers decide which entries apply (double step only while unmoved).
pub fn direction_vectors(kind: PieceType, team: Team) -> &'static [Vector] {
    match kind {
        PieceType::Queen | PieceType::King => &ROYAL_VECTORS,
        PieceType::Rook => &ORTHOGONAL,
        PieceType::Bishop => &DIAGONAL,
        PieceType::Knight => &KNIGHT_OFFSETS,
        PieceType::Pawn => match team {
            Team::White => &WHITE_PAWN,
            Team::Black => &BLACK_PAWN,
        },
    }
}

/// Whether a piece type slides along its vectors rather than stepping once
pub fn slides(kind: PieceType) -> bool {
    matches!(kind, PieceType::Queen | PieceType::Rook | PieceType::Bishop)
}
