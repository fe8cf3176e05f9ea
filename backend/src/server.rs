//! TCP game server
//!
//! ## Tasks
//!
//! - one accept loop
//! - one lobby loop ([`crate::lobby`])
//! - per session: a receive loop and a ping loop
//!
//! All of them watch the server's shutdown token, directly or through the
//! session's child token.
//!
//! ## Dispatch
//!
//! `RegisterUser` and `ClientDisconnecting` are accepted at any time; every
//! other command needs a registered name first.
//!
//! | Command               | Effect                                                  |
//! |-----------------------|---------------------------------------------------------|
//! | `RegisterUser`        | set the display name once, reply `WelcomeToServer`      |
//! | `LookingForGame`      | join the lobby unless already waiting                   |
//! | `NewMove`             | check on the server's board, relay verbatim to opponent |
//! | `Declare*`            | end the tracked game                                    |
//! | `ClientDisconnecting` | cancel the session                                      |
//!
//! Anything a client should not send is answered with `InvalidMove`.
//!
//! ## Teardown
//!
//! Runs once per session whichever way it ended: drop it from the registries,
//! say `ServerIsShuttingDown` if that's why, end its games and tell each
//! opponent (unless the server is stopping), join the ping task, close the
//! socket.

use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::game::TrackedGame;
use crate::ids::{IdAllocator, SessionId};
use crate::lobby::{self, Lobby};
use crate::session::Session;
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use shared::{Command, CommandCodec, CommandKind, GameId, Inbound, Outbound};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, trace, warn};

const SERVER_FULL_MESSAGE: &str = "Server is full, please try again later";

/// Registries and handles shared by every server task
pub struct ServerState {
    pub(crate) config: ServerConfig,
    pub(crate) connected: DashMap<SessionId, Arc<Session>>,
    pub(crate) games: DashMap<GameId, Arc<TrackedGame>>,
    pub(crate) lobby: Lobby,
    pub(crate) session_ids: IdAllocator,
    pub(crate) game_ids: IdAllocator,
    pub(crate) shutdown: CancellationToken,
    pub(crate) tasks: TaskTracker,
}

impl ServerState {
    pub(crate) fn new(config: ServerConfig) -> Self {
        ServerState {
            config,
            connected: DashMap::new(),
            games: DashMap::new(),
            lobby: Lobby::new(),
            session_ids: IdAllocator::new(),
            game_ids: IdAllocator::new(),
            shutdown: CancellationToken::new(),
            tasks: TaskTracker::new(),
        }
    }

    fn game(&self, id: GameId) -> Option<Arc<TrackedGame>> {
        self.games.get(&id).map(|entry| entry.value().clone())
    }
}

/// A bound listener that hasn't started accepting yet
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    state: Arc<ServerState>,
}

impl Server {
    /// Bind the listener. Port 0 picks a free port; see [`Server::local_addr`].
    pub async fn bind(config: ServerConfig) -> ServerResult<Self> {
        config.validate()?;
        let listener = TcpListener::bind(config.listen_addr).await?;
        let local_addr = listener.local_addr()?;
        Ok(Server {
            listener,
            local_addr,
            state: Arc::new(ServerState::new(config)),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Spawn the accept and lobby loops
    pub fn start(self) -> ServerHandle {
        info!("[SERVER] Listening on {}", self.local_addr);
        let accept = tokio::spawn(accept_loop(self.state.clone(), self.listener));
        let lobby = tokio::spawn(lobby::run(self.state.clone()));
        ServerHandle {
            state: self.state,
            local_addr: self.local_addr,
            accept,
            lobby,
        }
    }
}

/// Handle on a running server
pub struct ServerHandle {
    state: Arc<ServerState>,
    local_addr: SocketAddr,
    accept: JoinHandle<()>,
    lobby: JoinHandle<()>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn connected_sessions(&self) -> usize {
        self.state.connected.len()
    }

    pub fn active_games(&self) -> usize {
        self.state.games.len()
    }

    /// Lobby entries, including ones that will be skipped as stale
    pub fn waiting_players(&self) -> usize {
        self.state.lobby.len()
    }

    /// Stop the server
    ///
    /// Cancels the global scope, empties the lobby, waits for the accept and
    /// lobby loops, then tears down every session still connected. Each of
    /// them is sent `ServerIsShuttingDown` on the way out.
    pub async fn shutdown(self) {
        info!("[SERVER] Shutting down");
        self.state.shutdown.cancel();
        self.state.lobby.clear();

        let (accept, lobby) = tokio::join!(self.accept, self.lobby);
        if let Err(e) = accept {
            error!("[SERVER] Accept loop ended abnormally: {}", e);
        }
        if let Err(e) = lobby {
            error!("[SERVER] Lobby loop ended abnormally: {}", e);
        }

        let sessions: Vec<Arc<Session>> = self
            .state
            .connected
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        futures::future::join_all(sessions.iter().map(|s| teardown(&self.state, s))).await;

        self.state.tasks.close();
        self.state.tasks.wait().await;
        self.state.games.clear();
        info!("[SERVER] Shutdown complete");
    }
}

// ============================================================================
// Accept loop
// ============================================================================

async fn accept_loop(state: Arc<ServerState>, listener: TcpListener) {
    loop {
        let accepted = tokio::select! {
            _ = state.shutdown.cancelled() => break,
            accepted = listener.accept() => accepted,
        };
        let (stream, peer) = match accepted {
            Ok(conn) => conn,
            Err(e) => {
                warn!("[SERVER] Accept failed: {}", e);
                continue;
            }
        };

        if state.connected.len() >= state.config.max_connections {
            warn!(
                "[SERVER] Rejecting {}: {} connections already open",
                peer, state.config.max_connections
            );
            state
                .tasks
                .spawn(reject_full(stream, peer, state.config.notice_timeout));
            continue;
        }

        if let Err(e) = stream.set_nodelay(true) {
            debug!("[SERVER] set_nodelay on {}: {}", peer, e);
        }
        let (reader, writer) = stream.into_split();
        let session = Arc::new(Session::new(
            state.session_ids.next_id(),
            peer,
            Box::new(writer),
            state.shutdown.child_token(),
            state.config.notice_timeout,
        ));
        state.connected.insert(session.id(), session.clone());
        info!(
            "[SERVER] Session {} connected from {} ({}/{})",
            session.id(),
            peer,
            state.connected.len(),
            state.config.max_connections
        );

        state
            .tasks
            .spawn(run_session(state.clone(), session, reader));
    }
    info!("[SERVER] Accept loop stopped");
}

async fn reject_full(stream: TcpStream, peer: SocketAddr, timeout: Duration) {
    let mut frames = FramedWrite::new(stream, CommandCodec::new());
    let notice = Outbound::Command(Command::server_full(SERVER_FULL_MESSAGE));
    match tokio::time::timeout(timeout, frames.send(notice)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!("[SERVER] ServerFull to {} failed: {}", peer, e),
        Err(_) => debug!("[SERVER] ServerFull to {} timed out", peer),
    }
    match tokio::time::timeout(timeout, frames.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!("[SERVER] Closing rejected connection {} failed: {}", peer, e),
        Err(_) => debug!("[SERVER] Closing rejected connection {} timed out", peer),
    }
}

// ============================================================================
// Session loops
// ============================================================================

async fn run_session(state: Arc<ServerState>, session: Arc<Session>, reader: OwnedReadHalf) {
    let ping = state
        .tasks
        .spawn(ping_loop(session.clone(), state.config.ping_interval));
    session.set_ping_task(ping);

    let mut frames = FramedRead::new(reader, CommandCodec::new());
    loop {
        let next = tokio::select! {
            _ = session.scope().cancelled() => break,
            next = frames.next() => next,
        };
        match next {
            None => {
                info!("[SESSION] Session {} closed by peer", session.id());
                break;
            }
            Some(Err(e)) => {
                warn!("[SESSION] Session {} transport error: {}", session.id(), e);
                break;
            }
            Some(Ok(Inbound::Ping)) => trace!("[SESSION] Ping from session {}", session.id()),
            Some(Ok(Inbound::Malformed { reason })) => {
                warn!(
                    "[SESSION] Discarding malformed payload from session {}: {}",
                    session.id(),
                    reason
                );
            }
            Some(Ok(Inbound::Invalid { command, error })) => {
                debug!("[SESSION] Invalid {:?} from session {}: {}", command.kind, session.id(), error);
                reply(
                    &session,
                    Command::invalid_move(command.game_id, command.move_details, error.to_string()),
                )
                .await;
            }
            Some(Ok(Inbound::Command(command))) => dispatch(&state, &session, command).await,
        }
    }

    teardown(&state, &session).await;
}

async fn ping_loop(session: Arc<Session>, interval: Duration) {
    loop {
        tokio::select! {
            _ = session.scope().cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
        if !session.ping().await {
            if !session.scope().is_cancelled() {
                warn!("[SESSION] Session {} failed its liveness check", session.id());
                session.cancel();
            }
            break;
        }
    }
}

// ============================================================================
// Dispatch
// ============================================================================

async fn dispatch(state: &Arc<ServerState>, session: &Arc<Session>, command: Command) {
    match command.kind {
        CommandKind::RegisterUser => {
            let name = command.name.as_deref().unwrap_or_default();
            if session.register(name) {
                info!("[SESSION] Session {} registered as {}", session.id(), session.display_name());
                let welcome = format!("Welcome, {}!", session.display_name());
                reply(session, Command::welcome_to_server(welcome)).await;
            } else {
                debug!("[SESSION] Session {} tried to register twice", session.id());
            }
        }
        CommandKind::ClientDisconnecting => {
            info!("[SESSION] {} is disconnecting", session.display_name());
            session.cancel();
        }
        _ if !session.is_registered() => {
            reply(
                session,
                Command::invalid_move(command.game_id, command.move_details, "Register before playing"),
            )
            .await;
        }
        CommandKind::LookingForGame => {
            if state.lobby.enqueue(session) {
                info!("[LOBBY] {} is looking for a game", session.display_name());
            } else {
                debug!("[LOBBY] {} is already waiting", session.display_name());
            }
        }
        CommandKind::NewMove => relay_move(state, session, command).await,
        kind if kind.is_declaration() => declare(state, session, command).await,
        kind => {
            reply(
                session,
                Command::invalid_move(command.game_id, None, format!("Unexpected command {kind:?}")),
            )
            .await;
        }
    }
}

async fn relay_move(state: &ServerState, session: &Arc<Session>, command: Command) {
    let game_id = command.game_id;
    let Some(game) = state.game(game_id) else {
        let reason = format!("Unknown game {game_id}");
        reply(session, Command::invalid_move(game_id, command.move_details, reason)).await;
        return;
    };
    let Some(team) = game.team_of(session.id()) else {
        let reason = format!("Not a participant in game {game_id}");
        reply(session, Command::invalid_move(game_id, command.move_details, reason)).await;
        return;
    };
    let Some(mv) = command.move_details.as_ref() else {
        return;
    };

    match game.play(team, mv) {
        Ok(outcome) => debug!(
            "[GAME] Game {}: {} played {} ({:?})",
            game_id,
            team,
            mv.notation(),
            outcome
        ),
        Err(e) => {
            debug!("[GAME] Game {}: rejected {} from {}: {}", game_id, mv.notation(), team, e);
            reply(session, Command::invalid_move(game_id, Some(mv.clone()), e.to_string())).await;
            return;
        }
    }

    let opponent = game.session(team.opponent()).clone();
    let attempts = state.config.relay_attempts;
    if let Err(e) = opponent.send_with_attempts(command.into(), attempts).await {
        warn!(
            "[GAME] Game {}: relay to {} failed after {} attempts: {}",
            game_id,
            opponent.display_name(),
            attempts,
            e
        );
        opponent.cancel();
        if state.games.remove(&game_id).is_some() {
            reply(session, Command::opponent_client_disconnected(game_id)).await;
        }
    }
}

async fn declare(state: &ServerState, session: &Arc<Session>, command: Command) {
    let game_id = command.game_id;
    let Some(game) = state.game(game_id) else {
        // The other side's declaration usually gets here first.
        debug!("[GAME] {:?} for finished game {}", command.kind, game_id);
        return;
    };
    if !game.involves(session.id()) {
        let reason = format!("Not a participant in game {game_id}");
        reply(session, Command::invalid_move(game_id, None, reason)).await;
        return;
    }
    if state.games.remove(&game_id).is_some() {
        info!(
            "[GAME] Game {} ended: {} sent {:?} (server board: {:?})",
            game_id,
            session.display_name(),
            command.kind,
            game.match_state()
        );
    }
}

/// Best-effort reply to the sender
async fn reply(session: &Session, command: Command) {
    let kind = command.kind;
    if let Err(e) = session.send(command).await {
        debug!("[SESSION] {:?} to session {} failed: {}", kind, session.id(), e);
    }
}

// ============================================================================
// Teardown
// ============================================================================

async fn teardown(state: &ServerState, session: &Arc<Session>) {
    if !session.begin_teardown() {
        return;
    }
    let id = session.id();
    session.cancel();
    state.connected.remove(&id);
    state.lobby.remove(session);

    let shutting_down = state.shutdown.is_cancelled();
    if shutting_down {
        if let Err(e) = session.send_final(Command::server_is_shutting_down()).await {
            debug!("[SESSION] Shutdown notice to session {} failed: {}", id, e);
        }
    }

    let abandoned: Vec<GameId> = state
        .games
        .iter()
        .filter(|entry| entry.value().involves(id))
        .map(|entry| *entry.key())
        .collect();
    for game_id in abandoned {
        let Some((_, game)) = state.games.remove(&game_id) else {
            continue;
        };
        if shutting_down {
            continue;
        }
        if let Some(opponent) = game.opponent_of(id) {
            info!(
                "[GAME] Game {} abandoned by {}; notifying {}",
                game_id,
                session.display_name(),
                opponent.display_name()
            );
            reply(opponent, Command::opponent_client_disconnected(game_id)).await;
        }
    }

    if let Some(ping) = session.take_ping_task() {
        if let Err(e) = ping.await {
            debug!("[SESSION] Ping task of session {} ended abnormally: {}", id, e);
        }
    }
    session.close().await;
    info!("[SESSION] Session {} ({}) closed", id, session.display_name());
}
