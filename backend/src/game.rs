//! Tracked games
//!
//! A [`TrackedGame`] binds two sessions to one match under a game ID. The
//! server keeps its own [`GameSession`] for every match and replays each
//! relayed move on it, so out-of-turn or illegal moves are answered with
//! `InvalidMove` instead of being forwarded.

use crate::ids::SessionId;
use crate::session::Session;
use chess_engine::{ChessEngineError, GameSession, MatchState, MoveDescriptor, Team};
use parking_lot::Mutex;
use shared::GameId;
use std::sync::Arc;

pub struct TrackedGame {
    id: GameId,
    white: Arc<Session>,
    black: Arc<Session>,
    rules: Mutex<GameSession>,
}

impl std::fmt::Debug for TrackedGame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackedGame")
            .field("id", &self.id)
            .field("white", &self.white.id())
            .field("black", &self.black.id())
            .finish()
    }
}

impl TrackedGame {
    pub fn new(id: GameId, white: Arc<Session>, black: Arc<Session>) -> Self {
        TrackedGame {
            id,
            white,
            black,
            rules: Mutex::new(GameSession::new(Team::White)),
        }
    }

    pub fn id(&self) -> GameId {
        self.id
    }

    pub fn session(&self, team: Team) -> &Arc<Session> {
        match team {
            Team::White => &self.white,
            Team::Black => &self.black,
        }
    }

    /// Team played by `session`, `None` for outsiders
    pub fn team_of(&self, session: SessionId) -> Option<Team> {
        if self.white.id() == session {
            Some(Team::White)
        } else if self.black.id() == session {
            Some(Team::Black)
        } else {
            None
        }
    }

    pub fn involves(&self, session: SessionId) -> bool {
        self.team_of(session).is_some()
    }

    /// The other participant, `None` if `session` isn't in this game
    pub fn opponent_of(&self, session: SessionId) -> Option<&Arc<Session>> {
        self.team_of(session)
            .map(|team| self.session(team.opponent()))
    }

    /// Play `mv` for `team` on the server's copy of the board
    ///
    /// # Errors
    ///
    /// Whatever [`GameSession::submit_move`] rejects, plus a move whose piece
    /// belongs to the other team.
    pub fn play(&self, team: Team, mv: &MoveDescriptor) -> Result<MatchState, ChessEngineError> {
        if mv.team() != team {
            return Err(ChessEngineError::InvalidMove {
                piece: mv.piece.id.clone(),
                destination: mv.destination,
            });
        }
        self.rules.lock().submit_move(mv)
    }

    /// Outcome on the server's board, from White's point of view
    pub fn match_state(&self) -> MatchState {
        self.rules.lock().match_state()
    }
}
