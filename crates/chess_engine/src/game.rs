//! Game state machine
//!
//! [`GameSession`] owns the board, the turn, the no-capture counter and the
//! move history, and exposes a single mutating transaction:
//! [`GameSession::submit_move`].
//!
//! # Move Submission
//!
//! 1. Reject if the match is over or the mover is not the active team
//! 2. Look the move up in the piece's freshly generated legal moves; reject if
//!    absent (remote moves as `InvalidOpponentMove`, local as `InvalidMove`)
//! 3. Apply the generator's own descriptor to the board
//! 4. Flip the active team and clear the new active team's en-passant flags
//! 5. Reset or bump the no-capture counter
//! 6. Evaluate, in order: local king checkmated → `LocalLoss`, opponent king
//!    checkmated → `LocalWin`, draw → `Draw`
//! 7. Push the undo record onto the history
//!
//! Validation happens once, before any mutation, whichever side the move came
//! from.

use crate::attack;
use crate::board::Board;
use crate::error::{ChessEngineError, ChessEngineResult};
use crate::make_unmake::UndoRecord;
use crate::move_gen;
use crate::types::*;

/// Moves without a capture before the game is drawn
pub const NO_CAPTURE_DRAW_LIMIT: u32 = 50;

#[derive(Debug, Clone)]
struct HistoryEntry {
    record: UndoRecord,
    cleared_en_passant: Vec<PieceId>,
    prior_no_capture: u32,
    prior_state: MatchState,
}

/// One match seen from `local_team`'s side
#[derive(Debug, Clone)]
pub struct GameSession {
    board: Board,
    local_team: Team,
    active_team: Team,
    match_state: MatchState,
    moves_since_capture: u32,
    history: Vec<HistoryEntry>,
}

impl GameSession {
    /// Standard setup, White to move
    pub fn new(local_team: Team) -> Self {
        Self::with_board(Board::standard(), local_team, Team::White)
    }

    /// Start from an arbitrary position
    pub fn with_board(board: Board, local_team: Team, active_team: Team) -> Self {
        GameSession {
            board,
            local_team,
            active_team,
            match_state: MatchState::Playing,
            moves_since_capture: 0,
            history: Vec::new(),
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn local_team(&self) -> Team {
        self.local_team
    }

    pub fn active_team(&self) -> Team {
        self.active_team
    }

    pub fn match_state(&self) -> MatchState {
        self.match_state
    }

    pub fn moves_since_capture(&self) -> u32 {
        self.moves_since_capture
    }

    /// Number of moves played so far
    pub fn move_number(&self) -> usize {
        self.history.len()
    }

    /// Legal moves for one piece
    pub fn legal_moves(&mut self, id: &PieceId) -> ChessEngineResult<Vec<MoveDescriptor>> {
        move_gen::legal_moves(&mut self.board, id)
    }

    /// Legal moves for every piece of `team`
    pub fn all_legal_moves(&mut self, team: Team) -> ChessEngineResult<Vec<MoveDescriptor>> {
        move_gen::all_legal_moves(&mut self.board, team)
    }

    /// Find the legal move of the piece on `from` that lands on `to`
    ///
    /// Convenience for text input; returns `None` if no such legal move exists.
    pub fn find_move(
        &mut self,
        from: Coordinate,
        to: Coordinate,
        promotion: Option<PieceType>,
    ) -> ChessEngineResult<Option<MoveDescriptor>> {
        let Some(id) = self.board.piece_at(from).map(|p| p.id().clone()) else {
            return Ok(None);
        };
        Ok(self
            .legal_moves(&id)?
            .into_iter()
            .find(|mv| mv.matches(&id, to, promotion)))
    }

    pub fn is_in_check(&self, team: Team) -> bool {
        attack::is_in_check(&self.board, team)
    }

    /// In check with no legal move
    pub fn is_checkmate(&mut self, team: Team) -> ChessEngineResult<bool> {
        if !self.is_in_check(team) {
            return Ok(false);
        }
        Ok(!move_gen::has_any_legal_move(&mut self.board, team)?)
    }

    /// Fifty moves without capture, two pieces left, or the side to move is stuck
    pub fn is_draw(&mut self) -> ChessEngineResult<bool> {
        if self.moves_since_capture >= NO_CAPTURE_DRAW_LIMIT || self.board.remaining_pieces() <= 2 {
            return Ok(true);
        }
        let team = self.active_team;
        Ok(!self.is_in_check(team) && !move_gen::has_any_legal_move(&mut self.board, team)?)
    }

    /// Submit a move and return the resulting match state
    ///
    /// # Errors
    ///
    /// - [`ChessEngineError::GameOver`] once the match has ended
    /// - [`ChessEngineError::WrongTurn`] if the mover is not on turn
    /// - [`ChessEngineError::InvalidMove`] / [`ChessEngineError::InvalidOpponentMove`]
    ///   if the move is not legal
    ///
    /// On any error the session is unchanged.
    pub fn submit_move(&mut self, mv: &MoveDescriptor) -> ChessEngineResult<MatchState> {
        if self.match_state.is_terminal() {
            return Err(ChessEngineError::GameOver);
        }
        let team = mv.team();
        if team != self.active_team {
            return Err(ChessEngineError::WrongTurn { team });
        }

        let validated = self.validate(mv)?;
        let record = self.board.apply(&validated)?;

        self.active_team = team.opponent();
        let cleared_en_passant = self.clear_en_passant(self.active_team);

        let prior_no_capture = self.moves_since_capture;
        if record.was_capture() {
            self.moves_since_capture = 0;
        } else {
            self.moves_since_capture += 1;
        }

        let prior_state = self.match_state;
        self.history.push(HistoryEntry {
            record,
            cleared_en_passant,
            prior_no_capture,
            prior_state,
        });

        self.match_state = self.evaluate()?;
        Ok(self.match_state)
    }

    /// End the match for a reason outside the board (disconnect, server loss)
    pub fn end_with(&mut self, state: MatchState) {
        if !self.match_state.is_terminal() {
            self.match_state = state;
        }
    }

    /// Take back the most recent move
    pub fn undo_last(&mut self) -> ChessEngineResult<()> {
        let entry = self.history.pop().ok_or(ChessEngineError::EmptyHistory)?;
        let mover = entry.record.piece().team;
        self.board.undo(entry.record)?;
        for id in &entry.cleared_en_passant {
            let idx = self.board.index_of(id)?;
            self.board.piece_mut(idx).en_passant_vulnerable = true;
        }
        self.active_team = mover;
        self.moves_since_capture = entry.prior_no_capture;
        self.match_state = entry.prior_state;
        Ok(())
    }

    fn validate(&mut self, mv: &MoveDescriptor) -> ChessEngineResult<MoveDescriptor> {
        let local_team = self.local_team;
        let reject = || {
            if mv.team() == local_team {
                ChessEngineError::InvalidMove {
                    piece: mv.piece.id.clone(),
                    destination: mv.destination,
                }
            } else {
                ChessEngineError::InvalidOpponentMove {
                    piece: mv.piece.id.clone(),
                    destination: mv.destination,
                }
            }
        };

        let owner = self.board.piece(&mv.piece.id).map(|p| p.team());
        if owner != Some(mv.team()) {
            return Err(reject());
        }
        let legal = move_gen::legal_moves(&mut self.board, &mv.piece.id)?;
        legal
            .into_iter()
            .find(|candidate| candidate.matches(&mv.piece.id, mv.destination, mv.promotion))
            .ok_or_else(reject)
    }

    fn clear_en_passant(&mut self, team: Team) -> Vec<PieceId> {
        let mut cleared = Vec::new();
        for idx in self.board.team_indices(team) {
            let piece = self.board.piece_mut(idx);
            if piece.en_passant_vulnerable {
                piece.en_passant_vulnerable = false;
                cleared.push(piece.id.clone());
            }
        }
        cleared
    }

    fn evaluate(&mut self) -> ChessEngineResult<MatchState> {
        if self.is_checkmate(self.local_team)? {
            return Ok(MatchState::LocalLoss);
        }
        if self.is_checkmate(self.local_team.opponent())? {
            return Ok(MatchState::LocalWin);
        }
        if self.is_draw()? {
            return Ok(MatchState::Draw);
        }
        Ok(MatchState::Playing)
    }
}

#[cfg(test)]
mod tests;
