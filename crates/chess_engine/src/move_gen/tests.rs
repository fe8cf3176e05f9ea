//! Move generation test suite
//!
//! Verifies pseudo-legal generation and the check filter against concrete
//! positions built with [`Board::from_placements`].
//!
//! # Test Organization
//!
//! - `test_opening_*` - Standard position sanity
//! - `test_pawn_*` - Pushes, double step, captures, en passant, promotion
//! - `test_castling_*` - Every castling precondition
//! - `test_filter_*` - Pins and king safety

use super::*;

fn sq(s: &str) -> Coordinate {
    Coordinate::from_algebraic(s).unwrap()
}

/// Build a board from `(team, type, square)` triples
fn position(pieces: &[(Team, PieceType, &str)]) -> Board {
    let placements: Vec<_> = pieces.iter().map(|&(t, k, s)| (t, k, sq(s))).collect();
    Board::from_placements(&placements).unwrap()
}

fn moves_from(board: &mut Board, square: &str) -> Vec<MoveDescriptor> {
    let id = board.piece_at(sq(square)).unwrap().id().clone();
    legal_moves(board, &id).unwrap()
}

fn destinations(moves: &[MoveDescriptor]) -> Vec<String> {
    let mut out: Vec<String> = moves.iter().map(|m| m.destination.to_string()).collect();
    out.sort();
    out.dedup();
    out
}

// ============================================================================
// Opening Position
// ============================================================================

#[test]
fn test_opening_has_twenty_moves() {
    //! White has 16 pawn moves and 4 knight moves in the standard position.
    let mut board = Board::standard();
    assert_eq!(all_legal_moves(&mut board, Team::White).unwrap().len(), 20);
    assert_eq!(all_legal_moves(&mut board, Team::Black).unwrap().len(), 20);
}

#[test]
fn test_opening_e2e4_is_legal() {
    let mut board = Board::standard();
    let moves = moves_from(&mut board, "e2");
    let e4 = moves.iter().find(|m| m.destination == sq("e4")).unwrap();
    assert!(e4.en_passant_vulnerable);
    assert!(!e4.capturing);
}

#[test]
fn test_opening_no_diagonal_for_black_after_e4() {
    //! After 1. e4 nothing stands on c6/e6 and no en passant target exists, so
    //! the d7 and f7 pawns may only push.
    let mut board = Board::standard();
    let e4 = moves_from(&mut board, "e2")
        .into_iter()
        .find(|m| m.destination == sq("e4"))
        .unwrap();
    board.apply(&e4).unwrap();

    assert_eq!(destinations(&moves_from(&mut board, "d7")), vec!["d5", "d6"]);
    assert_eq!(destinations(&moves_from(&mut board, "f7")), vec!["f5", "f6"]);
}

#[test]
fn test_open_board_reach_by_piece_type() {
    //! Queens, rooks and bishops slide to the edge; kings and knights step once.
    for (kind, expected) in [
        (PieceType::Queen, 27),
        (PieceType::Rook, 14),
        (PieceType::Bishop, 13),
        (PieceType::Knight, 8),
    ] {
        let mut board = position(&[
            (Team::White, PieceType::King, "h1"),
            (Team::Black, PieceType::King, "h7"),
            (Team::White, kind, "d4"),
        ]);
        assert_eq!(moves_from(&mut board, "d4").len(), expected, "{kind:?}");
    }

    let mut board = position(&[
        (Team::White, PieceType::King, "d4"),
        (Team::Black, PieceType::King, "h7"),
    ]);
    assert_eq!(moves_from(&mut board, "d4").len(), 8);
}

#[test]
fn test_generation_leaves_board_unchanged() {
    let mut board = Board::standard();
    let before = board.clone();
    all_legal_moves(&mut board, Team::White).unwrap();
    assert_eq!(board, before);
}

#[test]
fn test_unknown_piece_is_an_error() {
    let mut board = Board::standard();
    assert!(matches!(
        legal_moves(&mut board, &PieceId::from("W-z9")),
        Err(crate::ChessEngineError::UnknownPiece { .. })
    ));
}

// ============================================================================
// Pawn Tests
// ============================================================================

#[test]
fn test_pawn_double_step_only_once() {
    //! A pawn on its starting square has one double step. After any move it is
    //! gone for good.
    let mut board = Board::standard();
    let moves = moves_from(&mut board, "a2");
    assert_eq!(destinations(&moves), vec!["a3", "a4"]);
    assert_eq!(moves.iter().filter(|m| m.en_passant_vulnerable).count(), 1);

    let a3 = moves.into_iter().find(|m| m.destination == sq("a3")).unwrap();
    board.apply(&a3).unwrap();
    assert_eq!(destinations(&moves_from(&mut board, "a3")), vec!["a4"]);
}

#[test]
fn test_pawn_double_step_needs_clear_path() {
    let mut board = position(&[
        (Team::White, PieceType::King, "e1"),
        (Team::Black, PieceType::King, "e8"),
        (Team::White, PieceType::Pawn, "c2"),
        (Team::Black, PieceType::Knight, "c3"),
        (Team::White, PieceType::Pawn, "d2"),
        (Team::Black, PieceType::Knight, "d4"),
    ]);
    assert!(moves_from(&mut board, "c2").iter().all(|m| m.destination != sq("c4")));
    assert_eq!(destinations(&moves_from(&mut board, "d2")), vec!["c3", "d3"]);
}

#[test]
fn test_pawn_captures_diagonally_only_on_enemies() {
    let mut board = position(&[
        (Team::White, PieceType::King, "a1"),
        (Team::Black, PieceType::King, "a8"),
        (Team::White, PieceType::Pawn, "e4"),
        (Team::Black, PieceType::Pawn, "d5"),
        (Team::White, PieceType::Knight, "f5"),
        (Team::Black, PieceType::Rook, "e5"),
    ]);
    let moves = moves_from(&mut board, "e4");
    assert_eq!(destinations(&moves), vec!["d5"]);
    let capture = &moves[0];
    assert!(capture.capturing);
    assert_eq!(capture.secondary.as_ref().unwrap().piece.location, sq("d5"));
    assert_eq!(capture.secondary.as_ref().unwrap().destination, None);
}

#[test]
fn test_pawn_en_passant_removes_pawn_beside() {
    let mut board = position(&[
        (Team::White, PieceType::King, "e1"),
        (Team::Black, PieceType::King, "e8"),
        (Team::White, PieceType::Pawn, "e5"),
        (Team::Black, PieceType::Pawn, "d7"),
    ]);
    let d5 = moves_from(&mut board, "d7")
        .into_iter()
        .find(|m| m.destination == sq("d5"))
        .unwrap();
    board.apply(&d5).unwrap();

    let moves = moves_from(&mut board, "e5");
    let en_passant = moves.iter().find(|m| m.destination == sq("d6")).unwrap();
    assert!(en_passant.capturing);
    let victim = en_passant.secondary.as_ref().unwrap();
    assert_eq!(victim.piece.location, sq("d5"));
    assert_eq!(victim.destination, None);

    board.apply(en_passant).unwrap();
    assert!(board.is_empty(sq("d5")));
    assert_eq!(board.remaining_pieces(), 3);
}

#[test]
fn test_pawn_no_en_passant_without_double_step() {
    let mut board = position(&[
        (Team::White, PieceType::King, "e1"),
        (Team::Black, PieceType::King, "e8"),
        (Team::White, PieceType::Pawn, "e5"),
        (Team::Black, PieceType::Pawn, "d6"),
    ]);
    let d5 = moves_from(&mut board, "d6")
        .into_iter()
        .find(|m| m.destination == sq("d5"))
        .unwrap();
    board.apply(&d5).unwrap();

    assert!(moves_from(&mut board, "e5").iter().all(|m| m.destination != sq("d6")));
}

#[test]
fn test_pawn_promotion_yields_four_candidates() {
    let mut board = position(&[
        (Team::White, PieceType::King, "e1"),
        (Team::Black, PieceType::King, "e8"),
        (Team::White, PieceType::Pawn, "a7"),
    ]);
    let moves = moves_from(&mut board, "a7");
    assert_eq!(moves.len(), 4);
    assert!(moves.iter().all(|m| m.destination == sq("a8")));
    assert!(moves.iter().all(|m| m.promotion.is_some()));

    let mut kinds: Vec<_> = moves.iter().filter_map(|m| m.promotion).collect();
    kinds.dedup();
    assert_eq!(kinds, PieceType::PROMOTIONS.to_vec());
}

#[test]
fn test_black_pawn_promotes_on_first_rank_with_capture() {
    let mut board = position(&[
        (Team::White, PieceType::King, "e1"),
        (Team::Black, PieceType::King, "e8"),
        (Team::Black, PieceType::Pawn, "b2"),
        (Team::White, PieceType::Rook, "b1"),
        (Team::White, PieceType::Knight, "a1"),
    ]);
    let moves = moves_from(&mut board, "b2");
    assert_eq!(moves.len(), 4);
    assert!(moves.iter().all(|m| m.destination == sq("a1") && m.capturing));
}

// ============================================================================
// Castling Tests
// ============================================================================

fn castling_board(extra: &[(Team, PieceType, &str)]) -> Board {
    let mut pieces = vec![
        (Team::White, PieceType::King, "e1"),
        (Team::White, PieceType::Rook, "a1"),
        (Team::White, PieceType::Rook, "h1"),
        (Team::Black, PieceType::King, "e8"),
    ];
    pieces.extend_from_slice(extra);
    position(&pieces)
}

fn castles(moves: &[MoveDescriptor]) -> Vec<String> {
    destinations(&moves.iter().filter(|m| m.castling).cloned().collect::<Vec<_>>())
}

#[test]
fn test_castling_both_sides_when_clear() {
    let mut board = castling_board(&[]);
    let moves = moves_from(&mut board, "e1");
    assert_eq!(castles(&moves), vec!["c1", "g1"]);

    let kingside = moves.iter().find(|m| m.castling && m.destination == sq("g1")).unwrap();
    let rook = kingside.secondary.as_ref().unwrap();
    assert_eq!(rook.piece.location, sq("h1"));
    assert_eq!(rook.destination, Some(sq("f1")));
}

#[test]
fn test_castling_blocked_by_piece_on_f1() {
    let mut board = castling_board(&[(Team::White, PieceType::Bishop, "f1")]);
    assert_eq!(castles(&moves_from(&mut board, "e1")), vec!["c1"]);
}

#[test]
fn test_castling_blocked_on_b1_for_queenside() {
    let mut board = castling_board(&[(Team::White, PieceType::Knight, "b1")]);
    assert_eq!(castles(&moves_from(&mut board, "e1")), vec!["g1"]);
}

#[test]
fn test_castling_not_through_attacked_square() {
    //! A black rook on f8 covers f1, which the king would cross.
    let mut board = castling_board(&[(Team::Black, PieceType::Rook, "f8")]);
    assert_eq!(castles(&moves_from(&mut board, "e1")), vec!["c1"]);
}

#[test]
fn test_castling_allowed_when_only_rook_path_attacked() {
    //! b1 is crossed by the rook but not by the king, so an attack on it is fine.
    let mut board = castling_board(&[(Team::Black, PieceType::Rook, "b8")]);
    assert_eq!(castles(&moves_from(&mut board, "e1")), vec!["c1", "g1"]);
}

#[test]
fn test_castling_not_out_of_check() {
    let mut board = castling_board(&[(Team::Black, PieceType::Rook, "e5")]);
    assert!(castles(&moves_from(&mut board, "e1")).is_empty());
}

#[test]
fn test_castling_disabled_after_rook_returns() {
    //! Move counters never go down in real play, so a rook that left and came
    //! back has still moved.
    let mut board = castling_board(&[]);
    let out = moves_from(&mut board, "h1")
        .into_iter()
        .find(|m| m.destination == sq("h2"))
        .unwrap();
    board.apply(&out).unwrap();
    let back = moves_from(&mut board, "h2")
        .into_iter()
        .find(|m| m.destination == sq("h1"))
        .unwrap();
    board.apply(&back).unwrap();

    assert_eq!(castles(&moves_from(&mut board, "e1")), vec!["c1"]);
}

#[test]
fn test_castling_disabled_after_king_moves() {
    let mut board = castling_board(&[]);
    let out = moves_from(&mut board, "e1")
        .into_iter()
        .find(|m| m.destination == sq("e2"))
        .unwrap();
    board.apply(&out).unwrap();
    let back = moves_from(&mut board, "e2")
        .into_iter()
        .find(|m| m.destination == sq("e1"))
        .unwrap();
    board.apply(&back).unwrap();

    assert!(castles(&moves_from(&mut board, "e1")).is_empty());
}

// ============================================================================
// Check Filter Tests
// ============================================================================

#[test]
fn test_filter_pinned_piece_stays_on_pin_line() {
    //! The e2 rook is pinned by the e8 queen; it may only slide along the e-file.
    let mut board = position(&[
        (Team::White, PieceType::King, "e1"),
        (Team::White, PieceType::Rook, "e2"),
        (Team::Black, PieceType::Queen, "e8"),
        (Team::Black, PieceType::King, "a8"),
    ]);
    let moves = moves_from(&mut board, "e2");
    assert!(moves.iter().all(|m| m.destination.col == 4));
    assert_eq!(destinations(&moves), vec!["e3", "e4", "e5", "e6", "e7", "e8"]);
}

#[test]
fn test_filter_king_cannot_step_into_attack() {
    let mut board = position(&[
        (Team::White, PieceType::King, "e1"),
        (Team::Black, PieceType::Rook, "d8"),
        (Team::Black, PieceType::King, "a8"),
    ]);
    let moves = moves_from(&mut board, "e1");
    assert!(moves.iter().all(|m| m.destination.col != 3));
    assert_eq!(destinations(&moves), vec!["e2", "f1", "f2"]);
}

#[test]
fn test_filter_every_move_leaves_king_safe() {
    //! Exhaustive over a busy middlegame-like position: no returned move may
    //! leave the mover's king in check.
    let mut board = position(&[
        (Team::White, PieceType::King, "g1"),
        (Team::White, PieceType::Queen, "d1"),
        (Team::White, PieceType::Rook, "f1"),
        (Team::White, PieceType::Knight, "f3"),
        (Team::White, PieceType::Bishop, "c4"),
        (Team::White, PieceType::Pawn, "f2"),
        (Team::White, PieceType::Pawn, "g2"),
        (Team::White, PieceType::Pawn, "e4"),
        (Team::Black, PieceType::King, "e8"),
        (Team::Black, PieceType::Queen, "h4"),
        (Team::Black, PieceType::Bishop, "b4"),
        (Team::Black, PieceType::Knight, "c6"),
        (Team::Black, PieceType::Rook, "a8"),
        (Team::Black, PieceType::Pawn, "f7"),
        (Team::Black, PieceType::Pawn, "d5"),
    ]);

    for team in Team::ALL {
        for mv in all_legal_moves(&mut board, team).unwrap() {
            let record = board.apply(&mv).unwrap();
            assert!(
                !is_in_check(&board, team),
                "{} leaves {team} in check",
                mv.notation()
            );
            board.undo(record).unwrap();
        }
    }
}

#[test]
fn test_filter_only_escapes_when_checked() {
    let mut board = position(&[
        (Team::White, PieceType::King, "e1"),
        (Team::White, PieceType::Rook, "a2"),
        (Team::Black, PieceType::Rook, "e7"),
        (Team::Black, PieceType::King, "a8"),
    ]);
    let rook_moves = moves_from(&mut board, "a2");
    assert_eq!(destinations(&rook_moves), vec!["e2"]);
}

#[test]
fn test_has_any_legal_move_short_circuits_to_true() {
    let mut board = Board::standard();
    assert!(has_any_legal_move(&mut board, Team::White).unwrap());
}
