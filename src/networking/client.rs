//! Server connection
//!
//! [`ChessClient`] owns the write half of one TCP connection to the backend.
//! Two tasks run under the client's cancellation token:
//!
//! - the receive loop decodes frames and forwards them as [`ClientEvent`]s
//! - the ping loop sends zero-length frames so a dead link is noticed even
//!   while the player is thinking
//!
//! Either task cancels the token when the connection breaks. Unless the
//! client disconnected on purpose, the event stream then ends with
//! [`ClientEvent::ConnectionLost`].

use super::error::{ClientError, ClientResult};
use chess_engine::{MatchState, MoveDescriptor, Team};
use futures::{SinkExt, StreamExt};
use shared::{Command, CommandCodec, CommandKind, GameId, Inbound, Outbound};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub connect_timeout: Duration,
    /// Upper bound for a single frame write
    pub write_timeout: Duration,
    pub ping_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            connect_timeout: Duration::from_secs(5),
            write_timeout: Duration::from_secs(2),
            ping_interval: Duration::from_secs(15),
        }
    }
}

/// Something the server told us, or the loss of the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    Welcome {
        message: String,
    },
    GameStarted {
        game_id: GameId,
        team: Team,
        opponent: String,
    },
    OpponentMoved {
        game_id: GameId,
        descriptor: MoveDescriptor,
    },
    /// The server refused a command; `descriptor` is the move it refers to, if any
    MoveRejected {
        game_id: GameId,
        descriptor: Option<MoveDescriptor>,
        reason: String,
    },
    OpponentDisconnected {
        game_id: GameId,
    },
    ServerShuttingDown,
    ServerFull {
        message: String,
    },
    ConnectionLost,
}

impl ClientEvent {
    /// Map a server command to an event; client-to-server kinds map to `None`
    pub fn from_command(command: Command) -> Option<Self> {
        let event = match command.kind {
            CommandKind::WelcomeToServer => ClientEvent::Welcome {
                message: command.message.unwrap_or_default(),
            },
            CommandKind::StartGameInstance => ClientEvent::GameStarted {
                game_id: command.game_id,
                team: command.assigned_team?,
                opponent: command.opponent_name?,
            },
            CommandKind::NewMove => ClientEvent::OpponentMoved {
                game_id: command.game_id,
                descriptor: command.move_details?,
            },
            CommandKind::InvalidMove => ClientEvent::MoveRejected {
                game_id: command.game_id,
                descriptor: command.move_details,
                reason: command
                    .message
                    .unwrap_or_else(|| "Rejected by server".to_string()),
            },
            CommandKind::OpponentClientDisconnected => ClientEvent::OpponentDisconnected {
                game_id: command.game_id,
            },
            CommandKind::ServerIsShuttingDown => ClientEvent::ServerShuttingDown,
            CommandKind::ServerFull => ClientEvent::ServerFull {
                message: command.message.unwrap_or_default(),
            },
            _ => return None,
        };
        Some(event)
    }
}

/// Write side shared by the client handle and its ping task
struct Connection {
    writer: Mutex<FramedWrite<OwnedWriteHalf, CommandCodec>>,
    scope: CancellationToken,
    write_timeout: Duration,
    /// Set by [`ChessClient::disconnect`]; suppresses `ConnectionLost`
    closing: AtomicBool,
}

impl Connection {
    /// Write one frame. A failed write cancels the connection.
    async fn send(&self, item: Outbound) -> ClientResult<()> {
        if self.scope.is_cancelled() {
            return Err(ClientError::Disconnected);
        }
        let mut writer = self.writer.lock().await;
        let result = match tokio::time::timeout(self.write_timeout, writer.send(item)).await {
            Ok(result) => result.map_err(ClientError::from),
            Err(_) => Err(ClientError::Timeout {
                action: "writing",
                timeout: self.write_timeout,
            }),
        };
        if result.is_err() {
            self.scope.cancel();
        }
        result
    }
}

pub struct ChessClient {
    conn: Arc<Connection>,
    tasks: TaskTracker,
    name: String,
    server: SocketAddr,
}

impl std::fmt::Debug for ChessClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChessClient")
            .field("name", &self.name)
            .field("server", &self.server)
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl ChessClient {
    /// Connect, register as `name` and start the background loops
    ///
    /// # Errors
    ///
    /// An empty name, a connect timeout, or a socket that fails before
    /// `RegisterUser` is written.
    pub async fn connect(
        server: SocketAddr,
        name: &str,
        config: ClientConfig,
    ) -> ClientResult<(Self, mpsc::UnboundedReceiver<ClientEvent>)> {
        let register = Command::register_user(name.trim())?;

        let stream = match tokio::time::timeout(config.connect_timeout, TcpStream::connect(server)).await {
            Ok(stream) => stream?,
            Err(_) => {
                return Err(ClientError::Timeout {
                    action: "connecting",
                    timeout: config.connect_timeout,
                })
            }
        };
        stream.set_nodelay(true)?;
        let (reader, writer) = stream.into_split();

        let conn = Arc::new(Connection {
            writer: Mutex::new(FramedWrite::new(writer, CommandCodec::new())),
            scope: CancellationToken::new(),
            write_timeout: config.write_timeout,
            closing: AtomicBool::new(false),
        });

        let (events, rx) = mpsc::unbounded_channel();
        let tasks = TaskTracker::new();
        tasks.spawn(receive_loop(
            FramedRead::new(reader, CommandCodec::new()),
            conn.clone(),
            events,
        ));
        tasks.spawn(ping_loop(conn.clone(), config.ping_interval));
        tasks.close();

        let client = ChessClient {
            conn,
            tasks,
            name: name.trim().to_string(),
            server,
        };
        client.send(register).await?;
        info!("[CLIENT] Connected to {} as {}", server, client.name);
        Ok((client, rx))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn server_addr(&self) -> SocketAddr {
        self.server
    }

    pub fn is_connected(&self) -> bool {
        !self.conn.scope.is_cancelled()
    }

    /// Ask the lobby for an opponent
    pub async fn look_for_game(&self) -> ClientResult<()> {
        self.send(Command::looking_for_game()).await
    }

    pub async fn send_move(&self, game_id: GameId, mv: &MoveDescriptor) -> ClientResult<()> {
        self.send(Command::new_move(game_id, mv.clone())).await
    }

    /// Report how a game ended on this side's board
    ///
    /// # Errors
    ///
    /// [`ClientError::NotDeclarable`] unless `state` is a win, a loss or a draw.
    pub async fn declare_result(&self, game_id: GameId, state: MatchState) -> ClientResult<()> {
        let declaration = match state {
            MatchState::LocalWin => Command::declare_win(game_id),
            MatchState::LocalLoss => Command::declare_loss(game_id),
            MatchState::Draw => Command::declare_stalemate(game_id),
            other => return Err(ClientError::NotDeclarable { state: other }),
        };
        self.send(declaration).await
    }

    /// Say goodbye, stop both loops and close the socket
    pub async fn disconnect(self) {
        self.conn.closing.store(true, Ordering::Release);
        if let Err(e) = self.send(Command::client_disconnecting()).await {
            debug!("[CLIENT] Goodbye not delivered: {}", e);
        }
        self.conn.scope.cancel();
        self.tasks.wait().await;

        let mut writer = self.conn.writer.lock().await;
        if let Ok(Err(e)) = tokio::time::timeout(self.conn.write_timeout, writer.close()).await {
            debug!("[CLIENT] Closing socket: {}", e);
        }
        info!("[CLIENT] Disconnected from {}", self.server);
    }

    async fn send(&self, command: Command) -> ClientResult<()> {
        self.conn.send(Outbound::Command(command)).await
    }
}

impl Drop for ChessClient {
    fn drop(&mut self) {
        self.conn.scope.cancel();
    }
}

async fn receive_loop(
    mut frames: FramedRead<OwnedReadHalf, CommandCodec>,
    conn: Arc<Connection>,
    events: mpsc::UnboundedSender<ClientEvent>,
) {
    loop {
        // Frames first: a notice already buffered still gets through after cancel.
        let next = tokio::select! {
            biased;
            next = frames.next() => next,
            _ = conn.scope.cancelled() => break,
        };
        match next {
            None => {
                info!("[CLIENT] Server closed the connection");
                break;
            }
            Some(Err(e)) => {
                warn!("[CLIENT] Connection error: {}", e);
                break;
            }
            Some(Ok(Inbound::Ping)) => {}
            Some(Ok(Inbound::Malformed { reason })) => {
                warn!("[CLIENT] Dropped malformed frame: {}", reason);
            }
            Some(Ok(Inbound::Invalid { command, error })) => {
                warn!("[CLIENT] Dropped {:?} frame: {}", command.kind, error);
            }
            Some(Ok(Inbound::Command(command))) => {
                let kind = command.kind;
                match ClientEvent::from_command(command) {
                    Some(event) => {
                        debug!("[CLIENT] {:?}", event);
                        if events.send(event).is_err() {
                            debug!("[CLIENT] Event receiver dropped");
                        }
                    }
                    None => debug!("[CLIENT] Ignoring {:?} from server", kind),
                }
            }
        }
    }

    conn.scope.cancel();
    if !conn.closing.load(Ordering::Acquire) {
        let _ = events.send(ClientEvent::ConnectionLost);
    }
}

async fn ping_loop(conn: Arc<Connection>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = conn.scope.cancelled() => break,
            _ = ticker.tick() => {}
        }
        if let Err(e) = conn.send(Outbound::Ping).await {
            warn!("[CLIENT] Ping failed, dropping connection: {}", e);
            break;
        }
    }
}
