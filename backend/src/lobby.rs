//! Matchmaking lobby
//!
//! Sessions that sent `LookingForGame` wait in a lock-free queue. A single
//! background loop takes them out two at a time and turns each pair into a
//! [`TrackedGame`].
//!
//! ## Pairing
//!
//! 1. Dequeue two distinct sessions; a session paired with itself is dropped
//! 2. Probe both with a ping, concurrently. A failed or closed side is
//!    cancelled and the survivor waits for the next candidate
//! 3. Pick teams uniformly at random and register the game
//! 4. Send `StartGameInstance` to Black, then White. White moves first, so
//!    Black already holds its board when the first relay arrives. If a send
//!    fails the game is unregistered and a side that was already told gets
//!    `OpponentClientDisconnected`
//!
//! Removal is lazy: teardown clears a session's queued flag and the loop skips
//! unflagged or closed sessions when it dequeues them.

use crate::error::ServerResult;
use crate::game::TrackedGame;
use crate::server::ServerState;
use crate::session::Session;
use chess_engine::Team;
use crossbeam_channel::{Receiver, Sender};
use rand::Rng;
use shared::Command;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Queue of sessions waiting for an opponent
pub struct Lobby {
    tx: Sender<Arc<Session>>,
    rx: Receiver<Arc<Session>>,
}

impl Lobby {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Lobby { tx, rx }
    }

    /// Queue `session` unless it is already waiting
    pub fn enqueue(&self, session: &Arc<Session>) -> bool {
        if session.is_closed() || !session.mark_queued() {
            return false;
        }
        if self.tx.send(session.clone()).is_err() {
            session.unmark_queued();
            return false;
        }
        true
    }

    /// Next session that is still waiting and still connected
    pub fn pop(&self) -> Option<Arc<Session>> {
        while let Ok(session) = self.rx.try_recv() {
            if session.is_queued() && !session.is_closed() {
                return Some(session);
            }
            debug!("[LOBBY] Skipping stale entry for session {}", session.id());
        }
        None
    }

    /// Withdraw `session`; its queue entry is skipped when reached
    pub fn remove(&self, session: &Session) {
        session.unmark_queued();
    }

    /// Drop every waiting entry
    pub fn clear(&self) {
        for session in self.rx.try_iter() {
            session.unmark_queued();
        }
    }

    /// Entries in the queue, stale ones included
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl Default for Lobby {
    fn default() -> Self {
        Self::new()
    }
}

/// Matchmaking loop; returns once the server's shutdown token fires
pub(crate) async fn run(state: Arc<ServerState>) {
    info!("[LOBBY] Matchmaking started");
    let mut waiting: Option<Arc<Session>> = None;

    while !state.shutdown.is_cancelled() {
        if waiting
            .as_ref()
            .is_some_and(|s| s.is_closed() || !s.is_queued())
        {
            waiting = None;
        }

        let Some(first) = waiting.take().or_else(|| state.lobby.pop()) else {
            if !idle(&state).await {
                break;
            }
            continue;
        };
        let Some(second) = state.lobby.pop() else {
            waiting = Some(first);
            if !idle(&state).await {
                break;
            }
            continue;
        };

        if first.id() == second.id() {
            debug!("[LOBBY] Discarding self-pairing of session {}", first.id());
            waiting = Some(first);
            continue;
        }

        waiting = pair(&state, first, second).await;
    }

    if let Some(session) = waiting {
        session.unmark_queued();
    }
    info!("[LOBBY] Matchmaking stopped");
}

/// Sleep one poll interval; `false` if shutdown fired first
async fn idle(state: &ServerState) -> bool {
    tokio::select! {
        _ = state.shutdown.cancelled() => false,
        _ = tokio::time::sleep(state.config.lobby_poll_interval) => true,
    }
}

/// Try to start a game between `a` and `b`; returns a side that should keep waiting
async fn pair(state: &ServerState, a: Arc<Session>, b: Arc<Session>) -> Option<Arc<Session>> {
    let (a_alive, b_alive) = tokio::join!(a.ping(), b.ping());
    match (a_alive, b_alive) {
        (true, true) => {}
        (true, false) => {
            discard(&b);
            return Some(a);
        }
        (false, true) => {
            discard(&a);
            return Some(b);
        }
        (false, false) => {
            discard(&a);
            discard(&b);
            return None;
        }
    }

    let (white, black) = if rand::rng().random_bool(0.5) {
        (a, b)
    } else {
        (b, a)
    };
    let game = Arc::new(TrackedGame::new(
        state.game_ids.next_id(),
        white.clone(),
        black.clone(),
    ));
    let game_id = game.id();
    state.games.insert(game_id, game.clone());

    if let Err(e) = send_start(&game, Team::Black).await {
        warn!("[LOBBY] Could not start game {} with {}: {}", game_id, black.display_name(), e);
        state.games.remove(&game_id);
        black.cancel();
        return Some(white);
    }

    if let Err(e) = send_start(&game, Team::White).await {
        warn!("[LOBBY] Could not start game {} with {}: {}", game_id, white.display_name(), e);
        white.cancel();
        black.unmark_queued();
        if state.games.remove(&game_id).is_some() {
            if let Err(e) = black.send(Command::opponent_client_disconnected(game_id)).await {
                debug!("[LOBBY] Retraction to {} failed: {}", black.display_name(), e);
            }
        }
        return None;
    }

    white.unmark_queued();
    black.unmark_queued();
    info!(
        "[LOBBY] Game {} started: {} (White) vs {} (Black)",
        game_id,
        white.display_name(),
        black.display_name()
    );
    None
}

async fn send_start(game: &TrackedGame, team: Team) -> ServerResult<()> {
    let side = game.session(team);
    let opponent = game.session(team.opponent());
    let notice = Command::start_game_instance(game.id(), team, opponent.display_name())?;
    side.send(notice).await
}

fn discard(session: &Session) {
    warn!(
        "[LOBBY] Session {} failed its liveness probe; dropping it",
        session.id()
    );
    session.unmark_queued();
    session.cancel();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use futures::StreamExt;
    use shared::{CommandCodec, CommandKind, Inbound};
    use std::net::SocketAddr;
    use std::time::Duration;
    use tokio::io::DuplexStream;
    use tokio_util::codec::FramedRead;
    use tokio_util::sync::CancellationToken;

    fn session(id: u64) -> (Arc<Session>, DuplexStream) {
        session_with_buffer(id, 256)
    }

    /// A session whose peer accepts at most `buffer` unread bytes
    fn session_with_buffer(id: u64, buffer: usize) -> (Arc<Session>, DuplexStream) {
        let (server_side, client_side) = tokio::io::duplex(buffer);
        let session = Session::new(
            id,
            SocketAddr::from(([127, 0, 0, 1], 40000 + id as u16)),
            Box::new(server_side),
            CancellationToken::new(),
            Duration::from_millis(100),
        );
        (Arc::new(session), client_side)
    }

    #[test]
    fn test_enqueue_is_idempotent() {
        let lobby = Lobby::new();
        let (a, _a) = session(1);
        assert!(lobby.enqueue(&a));
        assert!(!lobby.enqueue(&a));
        assert_eq!(lobby.len(), 1);
    }

    #[test]
    fn test_pop_is_fifo() {
        let lobby = Lobby::new();
        let (a, _a) = session(1);
        let (b, _b) = session(2);
        lobby.enqueue(&a);
        lobby.enqueue(&b);
        assert_eq!(lobby.pop().map(|s| s.id()), Some(1));
        assert_eq!(lobby.pop().map(|s| s.id()), Some(2));
        assert!(lobby.pop().is_none());
    }

    #[test]
    fn test_removed_and_closed_sessions_are_skipped() {
        let lobby = Lobby::new();
        let (a, _a) = session(1);
        let (b, _b) = session(2);
        let (c, _c) = session(3);
        lobby.enqueue(&a);
        lobby.enqueue(&b);
        lobby.enqueue(&c);

        lobby.remove(&a);
        b.cancel();
        assert_eq!(lobby.pop().map(|s| s.id()), Some(3));
        assert!(lobby.is_empty());
    }

    #[test]
    fn test_closed_session_cannot_enqueue() {
        let lobby = Lobby::new();
        let (a, _a) = session(1);
        a.cancel();
        assert!(!lobby.enqueue(&a));
    }

    #[test]
    fn test_clear_allows_requeue() {
        let lobby = Lobby::new();
        let (a, _a) = session(1);
        lobby.enqueue(&a);
        lobby.clear();
        assert!(lobby.is_empty());
        assert!(!a.is_queued());
        assert!(lobby.enqueue(&a));
    }

    #[tokio::test]
    async fn test_black_is_told_before_white() {
        // `a` takes a ping but stalls on a start notice, so its side always
        // fails. `b` may only hear of the game when it plays Black.
        let state = ServerState::new(ServerConfig::default());
        let (mut a_was_black, mut a_was_white) = (0, 0);

        for round in 0..32u64 {
            let (a, _a) = session_with_buffer(round * 2 + 1, 8);
            let (b, b_client) = session_with_buffer(round * 2 + 2, 4096);
            let mut b_frames = FramedRead::new(b_client, CommandCodec::new());

            let waiting = pair(&state, a.clone(), b.clone()).await;
            assert!(a.is_closed());
            assert!(state.games.is_empty());
            assert_eq!(b_frames.next().await.unwrap().unwrap(), Inbound::Ping);

            match waiting {
                Some(survivor) => {
                    assert_eq!(survivor.id(), b.id());
                    let nothing = tokio::time::timeout(Duration::from_millis(20), b_frames.next()).await;
                    assert!(nothing.is_err(), "White was told about a game Black never joined");
                    a_was_black += 1;
                }
                None => {
                    let Some(Ok(Inbound::Command(start))) = b_frames.next().await else {
                        panic!("expected a start notice");
                    };
                    assert_eq!(start.kind, CommandKind::StartGameInstance);
                    assert_eq!(start.assigned_team, Some(Team::Black));
                    let Some(Ok(Inbound::Command(retraction))) = b_frames.next().await else {
                        panic!("expected a retraction");
                    };
                    assert_eq!(retraction.kind, CommandKind::OpponentClientDisconnected);
                    assert!(!b.is_queued());
                    a_was_white += 1;
                }
            }
        }
        assert!(a_was_black > 0 && a_was_white > 0);
    }
}
