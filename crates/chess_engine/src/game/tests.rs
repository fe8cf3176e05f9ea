//! Game state machine tests
//!
//! Drive [`GameSession`] through whole scenarios: turn order, rejection of
//! illegal moves from either side, checkmate from both points of view, the
//! three draw rules, en passant expiry and history rewind.

use super::*;
use assert_matches::assert_matches;

fn sq(s: &str) -> Coordinate {
    Coordinate::from_algebraic(s).unwrap()
}

fn session_from(pieces: &[(Team, PieceType, &str)], local: Team, active: Team) -> GameSession {
    let placements: Vec<_> = pieces.iter().map(|&(t, k, s)| (t, k, sq(s))).collect();
    GameSession::with_board(Board::from_placements(&placements).unwrap(), local, active)
}

/// Play `from` → `to` through the legal-move lookup
fn play(session: &mut GameSession, from: &str, to: &str) -> ChessEngineResult<MatchState> {
    let mv = session
        .find_move(sq(from), sq(to), None)?
        .unwrap_or_else(|| panic!("{from}{to} should be legal"));
    session.submit_move(&mv)
}

/// A hand-built quiet descriptor that skips the generator
fn raw_move(session: &GameSession, from: &str, to: &str) -> MoveDescriptor {
    MoveDescriptor {
        piece: session.board().snapshot_at(sq(from)).unwrap(),
        destination: sq(to),
        secondary: None,
        capturing: false,
        castling: false,
        en_passant_vulnerable: false,
        promotion: None,
    }
}

fn fools_mate(local: Team) -> GameSession {
    let mut session = GameSession::new(local);
    play(&mut session, "f2", "f3").unwrap();
    play(&mut session, "e7", "e5").unwrap();
    play(&mut session, "g2", "g4").unwrap();
    session
}

// ============================================================================
// Turn Order and Rejection
// ============================================================================

#[test]
fn test_new_session_white_to_move() {
    let session = GameSession::new(Team::Black);
    assert_eq!(session.active_team(), Team::White);
    assert_eq!(session.local_team(), Team::Black);
    assert_eq!(session.match_state(), MatchState::Playing);
    assert_eq!(session.move_number(), 0);
}

#[test]
fn test_wrong_turn_rejected() {
    let mut session = GameSession::new(Team::White);
    let mv = raw_move(&session, "e7", "e5");
    assert_matches!(
        session.submit_move(&mv),
        Err(ChessEngineError::WrongTurn { team: Team::Black })
    );
    assert_eq!(session.active_team(), Team::White);
}

#[test]
fn test_illegal_local_move_is_invalid_move() {
    let mut session = GameSession::new(Team::White);
    let before = session.board().clone();
    let mv = raw_move(&session, "e2", "e5");
    assert_matches!(
        session.submit_move(&mv),
        Err(ChessEngineError::InvalidMove { destination, .. }) if destination == sq("e5")
    );
    assert_eq!(session.board(), &before);
    assert_eq!(session.move_number(), 0);
}

#[test]
fn test_illegal_remote_move_is_invalid_opponent_move() {
    //! The local player is Black, so a bad White move came over the wire.
    let mut session = GameSession::new(Team::Black);
    let mv = raw_move(&session, "g1", "g3");
    assert_matches!(
        session.submit_move(&mv),
        Err(ChessEngineError::InvalidOpponentMove { .. })
    );
}

#[test]
fn test_snapshot_with_wrong_team_rejected() {
    //! A descriptor claiming White ownership of a Black piece is rejected
    //! before generation.
    let mut session = GameSession::new(Team::White);
    let mut mv = raw_move(&session, "e7", "e6");
    mv.piece.team = Team::White;
    assert_matches!(session.submit_move(&mv), Err(ChessEngineError::InvalidMove { .. }));
}

#[test]
fn test_generator_descriptor_replaces_submitted_flags() {
    //! A submitted double step without the en-passant flag still produces a
    //! vulnerable pawn, because the generator's own descriptor is applied.
    let mut session = GameSession::new(Team::White);
    let mv = raw_move(&session, "e2", "e4");
    assert!(!mv.en_passant_vulnerable);
    session.submit_move(&mv).unwrap();

    let pawn = session.board().piece_at(sq("e4")).unwrap();
    assert!(pawn.is_en_passant_vulnerable());
    assert_eq!(pawn.move_count(), 1);
}

#[test]
fn test_promotion_requires_a_type() {
    let mut session = session_from(
        &[
            (Team::White, PieceType::King, "e1"),
            (Team::Black, PieceType::King, "e8"),
            (Team::White, PieceType::Pawn, "a7"),
        ],
        Team::White,
        Team::White,
    );
    let plain = raw_move(&session, "a7", "a8");
    assert_matches!(session.submit_move(&plain), Err(ChessEngineError::InvalidMove { .. }));

    let mut queen = plain;
    queen.promotion = Some(PieceType::Queen);
    session.submit_move(&queen).unwrap();
    assert_eq!(session.board().piece_at(sq("a8")).unwrap().kind(), PieceType::Queen);
}

// ============================================================================
// Checkmate
// ============================================================================

#[test]
fn test_fools_mate_is_local_loss_for_white() {
    let mut session = fools_mate(Team::White);
    assert_eq!(play(&mut session, "d8", "h4").unwrap(), MatchState::LocalLoss);
    assert!(session.is_in_check(Team::White));
    assert!(session.is_checkmate(Team::White).unwrap());
}

#[test]
fn test_fools_mate_is_local_win_for_black() {
    let mut session = fools_mate(Team::Black);
    assert_eq!(play(&mut session, "d8", "h4").unwrap(), MatchState::LocalWin);
}

#[test]
fn test_no_moves_after_game_over() {
    let mut session = fools_mate(Team::White);
    play(&mut session, "d8", "h4").unwrap();
    let mv = raw_move(&session, "a2", "a3");
    assert_matches!(session.submit_move(&mv), Err(ChessEngineError::GameOver));
}

#[test]
fn test_check_is_not_mate() {
    let mut session = GameSession::new(Team::White);
    play(&mut session, "e2", "e4").unwrap();
    play(&mut session, "f7", "f6").unwrap();
    assert_eq!(play(&mut session, "d1", "h5").unwrap(), MatchState::Playing);
    assert!(session.is_in_check(Team::Black));
    assert!(!session.is_checkmate(Team::Black).unwrap());
}

// ============================================================================
// Draws
// ============================================================================

#[test]
fn test_fifty_moves_without_capture_is_draw() {
    let mut session = session_from(
        &[
            (Team::White, PieceType::King, "e1"),
            (Team::White, PieceType::Rook, "a1"),
            (Team::Black, PieceType::King, "e8"),
            (Team::Black, PieceType::Rook, "h8"),
        ],
        Team::White,
        Team::White,
    );

    for round in 0..25 {
        let (w_from, w_to, b_from, b_to) = if round % 2 == 0 {
            ("a1", "a2", "h8", "h7")
        } else {
            ("a2", "a1", "h7", "h8")
        };
        assert_eq!(play(&mut session, w_from, w_to).unwrap(), MatchState::Playing);
        let state = play(&mut session, b_from, b_to).unwrap();
        if round < 24 {
            assert_eq!(state, MatchState::Playing);
        } else {
            assert_eq!(state, MatchState::Draw);
        }
    }
    assert_eq!(session.moves_since_capture(), NO_CAPTURE_DRAW_LIMIT);
}

#[test]
fn test_capture_resets_counter() {
    let mut session = GameSession::new(Team::White);
    play(&mut session, "e2", "e4").unwrap();
    play(&mut session, "d7", "d5").unwrap();
    assert_eq!(session.moves_since_capture(), 2);
    play(&mut session, "e4", "d5").unwrap();
    assert_eq!(session.moves_since_capture(), 0);
}

#[test]
fn test_two_kings_left_is_draw() {
    let mut session = session_from(
        &[
            (Team::White, PieceType::King, "e1"),
            (Team::Black, PieceType::King, "e8"),
            (Team::Black, PieceType::Knight, "d2"),
        ],
        Team::White,
        Team::White,
    );
    assert_eq!(play(&mut session, "e1", "d2").unwrap(), MatchState::Draw);
    assert_eq!(session.board().remaining_pieces(), 2);
}

#[test]
fn test_stalemate_is_draw() {
    //! After Qg6 the black king on h8 is not in check and every flight square
    //! is covered.
    let mut session = session_from(
        &[
            (Team::White, PieceType::King, "a1"),
            (Team::White, PieceType::Queen, "f5"),
            (Team::Black, PieceType::King, "h8"),
        ],
        Team::White,
        Team::White,
    );
    assert_eq!(play(&mut session, "f5", "g6").unwrap(), MatchState::Draw);
    assert!(!session.is_in_check(Team::Black));
    assert!(!session.is_checkmate(Team::Black).unwrap());
}

// ============================================================================
// En Passant Lifetime
// ============================================================================

fn en_passant_session() -> GameSession {
    session_from(
        &[
            (Team::White, PieceType::King, "e1"),
            (Team::White, PieceType::Pawn, "e5"),
            (Team::Black, PieceType::King, "e8"),
            (Team::Black, PieceType::Pawn, "d7"),
        ],
        Team::White,
        Team::Black,
    )
}

#[test]
fn test_en_passant_available_immediately() {
    let mut session = en_passant_session();
    play(&mut session, "d7", "d5").unwrap();
    play(&mut session, "e5", "d6").unwrap();
    assert!(session.board().is_empty(sq("d5")));
    assert_eq!(session.moves_since_capture(), 0);
}

#[test]
fn test_en_passant_expires_after_one_turn() {
    let mut session = en_passant_session();
    play(&mut session, "d7", "d5").unwrap();
    play(&mut session, "e1", "f1").unwrap();
    play(&mut session, "e8", "f8").unwrap();
    assert_eq!(session.find_move(sq("e5"), sq("d6"), None).unwrap(), None);
}

// ============================================================================
// History
// ============================================================================

#[test]
fn test_undo_last_restores_everything() {
    let mut session = GameSession::new(Team::White);
    let start = session.board().clone();
    play(&mut session, "e2", "e4").unwrap();
    play(&mut session, "d7", "d5").unwrap();
    play(&mut session, "e4", "d5").unwrap();

    for _ in 0..3 {
        session.undo_last().unwrap();
    }
    assert_eq!(session.board(), &start);
    assert_eq!(session.active_team(), Team::White);
    assert_eq!(session.moves_since_capture(), 0);
    assert_matches!(session.undo_last(), Err(ChessEngineError::EmptyHistory));
}

#[test]
fn test_undo_last_restores_en_passant_flag() {
    let mut session = en_passant_session();
    play(&mut session, "d7", "d5").unwrap();
    play(&mut session, "e1", "f1").unwrap();
    session.undo_last().unwrap();
    assert!(session.find_move(sq("e5"), sq("d6"), None).unwrap().is_some());
}

#[test]
fn test_undo_last_reopens_finished_game() {
    let mut session = fools_mate(Team::White);
    play(&mut session, "d8", "h4").unwrap();
    session.undo_last().unwrap();
    assert_eq!(session.match_state(), MatchState::Playing);
    assert_eq!(session.active_team(), Team::Black);
}

#[test]
fn test_end_with_is_sticky() {
    let mut session = GameSession::new(Team::White);
    session.end_with(MatchState::OpponentDisconnected);
    session.end_with(MatchState::ServerUnavailable);
    assert_eq!(session.match_state(), MatchState::OpponentDisconnected);

    let mv = raw_move(&session, "e2", "e4");
    assert_matches!(session.submit_move(&mv), Err(ChessEngineError::GameOver));
}
