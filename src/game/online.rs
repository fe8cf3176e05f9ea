//! Client-side mirror of one online match
//!
//! [`OnlineGame`] is what a front end talks to. It wraps the local
//! [`GameSession`], sends the player's moves through a [`ChessClient`] and
//! folds server events back into the board, reporting each change as a
//! [`GameUpdate`] to re-render from.
//!
//! The server does not acknowledge moves. A move counts as accepted once the
//! opponent answers it; until then a `MoveRejected` for it takes it back.

use crate::networking::{ChessClient, ClientError, ClientEvent, ClientResult};
use chess_engine::{
    ChessEngineError, Coordinate, GameSession, MatchState, MoveDescriptor, PieceId,
    PieceSnapshot, PieceType, Team,
};
use shared::GameId;
use tracing::{debug, info, warn};

/// What changed on the board after a network event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameUpdate {
    /// The opponent's move was replayed; `state` is the result on our board
    OpponentMoved {
        descriptor: MoveDescriptor,
        state: MatchState,
    },
    /// The server refused our last move and it was taken back
    MoveRetracted {
        descriptor: MoveDescriptor,
        reason: String,
    },
    /// The server refused something that left the board untouched
    Rejected { reason: String },
    /// The match ended off the board (opponent gone, server gone)
    Ended { state: MatchState },
}

#[derive(Debug)]
pub struct OnlineGame {
    game_id: GameId,
    opponent: String,
    session: GameSession,
    /// Our latest move, until the opponent's reply confirms it
    unconfirmed: Option<MoveDescriptor>,
    declared: bool,
}

impl OnlineGame {
    pub fn new(game_id: GameId, team: Team, opponent: impl Into<String>) -> Self {
        OnlineGame {
            game_id,
            opponent: opponent.into(),
            session: GameSession::new(team),
            unconfirmed: None,
            declared: false,
        }
    }

    /// Build the mirror from a `GameStarted` event
    pub fn from_event(event: &ClientEvent) -> Option<Self> {
        match event {
            ClientEvent::GameStarted {
                game_id,
                team,
                opponent,
            } => Some(Self::new(*game_id, *team, opponent.clone())),
            _ => None,
        }
    }

    pub fn game_id(&self) -> GameId {
        self.game_id
    }

    pub fn team(&self) -> Team {
        self.session.local_team()
    }

    pub fn opponent(&self) -> &str {
        &self.opponent
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }

    pub fn match_state(&self) -> MatchState {
        self.session.match_state()
    }

    pub fn is_my_turn(&self) -> bool {
        !self.match_state().is_terminal() && self.session.active_team() == self.team()
    }

    /// Piece on `square`, if any
    pub fn square(&self, square: Coordinate) -> Option<PieceSnapshot> {
        self.session.board().snapshot_at(square)
    }

    /// Moves the player may make with `piece` right now
    ///
    /// Empty when it is not our turn or the piece is the opponent's.
    pub fn legal_moves(&mut self, piece: &PieceId) -> ClientResult<Vec<MoveDescriptor>> {
        let ours = self
            .session
            .board()
            .piece(piece)
            .is_some_and(|p| p.team() == self.team());
        if !ours || !self.is_my_turn() {
            return Ok(Vec::new());
        }
        Ok(self.session.legal_moves(piece)?)
    }

    /// Our legal move from `from` to `to`, for text or click input
    pub fn find_move(
        &mut self,
        from: Coordinate,
        to: Coordinate,
        promotion: Option<PieceType>,
    ) -> ClientResult<Option<MoveDescriptor>> {
        if self.square(from).is_some_and(|p| p.team != self.team()) {
            return Ok(None);
        }
        Ok(self.session.find_move(from, to, promotion)?)
    }

    /// Play `mv` locally, send it, and declare the result if it ended the game
    ///
    /// # Errors
    ///
    /// Engine rejections leave everything untouched. If the move cannot be
    /// sent it is taken back before the error is returned.
    pub async fn submit_move(
        &mut self,
        client: &ChessClient,
        mv: &MoveDescriptor,
    ) -> ClientResult<MatchState> {
        if mv.team() != self.team() {
            return Err(ChessEngineError::InvalidMove {
                piece: mv.piece.id.clone(),
                destination: mv.destination,
            }
            .into());
        }
        let state = self.session.submit_move(mv)?;

        if let Err(e) = client.send_move(self.game_id, mv).await {
            self.session.undo_last()?;
            return Err(e);
        }
        debug!("[GAME] Sent {} in game {}", mv.notation(), self.game_id);
        self.unconfirmed = Some(mv.clone());

        if state.is_terminal() {
            self.declare_outcome(client).await?;
        }
        Ok(state)
    }

    /// Send the Declare* matching a finished board, at most once
    pub async fn declare_outcome(&mut self, client: &ChessClient) -> ClientResult<()> {
        if self.declared {
            return Ok(());
        }
        match client.declare_result(self.game_id, self.match_state()).await {
            Ok(()) => {
                self.declared = true;
                info!(
                    "[GAME] Game {} over: {}",
                    self.game_id,
                    self.match_state().message()
                );
                Ok(())
            }
            // Off-board endings have nothing to declare.
            Err(ClientError::NotDeclarable { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Fold a network event into the board
    ///
    /// Returns `None` for events that belong to another game or change
    /// nothing here.
    ///
    /// # Errors
    ///
    /// [`ChessEngineError::InvalidOpponentMove`] (wrapped) when the opponent's
    /// move does not replay on our board.
    pub fn apply_event(&mut self, event: &ClientEvent) -> ClientResult<Option<GameUpdate>> {
        match event {
            ClientEvent::OpponentMoved {
                game_id,
                descriptor,
            } if *game_id == self.game_id => {
                if descriptor.team() == self.team() {
                    return Err(ChessEngineError::InvalidOpponentMove {
                        piece: descriptor.piece.id.clone(),
                        destination: descriptor.destination,
                    }
                    .into());
                }
                let state = self.session.submit_move(descriptor)?;
                self.unconfirmed = None;
                Ok(Some(GameUpdate::OpponentMoved {
                    descriptor: descriptor.clone(),
                    state,
                }))
            }
            ClientEvent::MoveRejected {
                game_id,
                descriptor,
                reason,
            } if *game_id == self.game_id => Ok(Some(self.retract(descriptor.as_ref(), reason)?)),
            ClientEvent::OpponentDisconnected { game_id } if *game_id == self.game_id => {
                Ok(self.end(MatchState::OpponentDisconnected))
            }
            ClientEvent::ServerShuttingDown | ClientEvent::ConnectionLost => {
                Ok(self.end(MatchState::ServerUnavailable))
            }
            _ => Ok(None),
        }
    }

    fn retract(&mut self, refused: Option<&MoveDescriptor>, reason: &str) -> ClientResult<GameUpdate> {
        let pending = match (&self.unconfirmed, refused) {
            (Some(_), None) => true,
            (Some(pending), Some(refused)) => pending == refused,
            (None, _) => false,
        };
        if !pending {
            warn!("[GAME] Server rejected a command in game {}: {}", self.game_id, reason);
            return Ok(GameUpdate::Rejected {
                reason: reason.to_string(),
            });
        }

        self.session.undo_last()?;
        self.declared = false;
        let descriptor = self.unconfirmed.take().ok_or(ChessEngineError::EmptyHistory)?;
        warn!(
            "[GAME] Server refused {} in game {}: {}",
            descriptor.notation(),
            self.game_id,
            reason
        );
        Ok(GameUpdate::MoveRetracted {
            descriptor,
            reason: reason.to_string(),
        })
    }

    fn end(&mut self, state: MatchState) -> Option<GameUpdate> {
        if self.match_state().is_terminal() {
            return None;
        }
        self.session.end_with(state);
        info!("[GAME] Game {} ended: {}", self.game_id, state.message());
        Some(GameUpdate::Ended { state })
    }
}

/// Parse coordinate notation such as `e2e4` or `e7e8q`
pub fn parse_coordinate_move(text: &str) -> Option<(Coordinate, Coordinate, Option<PieceType>)> {
    let text = text.trim();
    if !text.is_ascii() || !(4..=5).contains(&text.len()) {
        return None;
    }
    let from = Coordinate::from_algebraic(&text[0..2])?;
    let to = Coordinate::from_algebraic(&text[2..4])?;
    let promotion = match text[4..].chars().next() {
        Some(c) => Some(PieceType::from_promotion_char(c)?),
        None => None,
    };
    Some((from, to, promotion))
}
