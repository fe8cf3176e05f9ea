//! Helpers for driving a real server over TCP

#![allow(dead_code)]

use backend::{Server, ServerConfig, ServerHandle};
use futures::{SinkExt, StreamExt};
use shared::{Command, CommandCodec, CommandKind, Inbound, Outbound};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

pub const RECV_TIMEOUT: Duration = Duration::from_secs(5);

pub fn test_config() -> ServerConfig {
    ServerConfig {
        listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        ping_interval: Duration::from_millis(200),
        lobby_poll_interval: Duration::from_millis(20),
        ..ServerConfig::default()
    }
}

pub async fn start_server(config: ServerConfig) -> ServerHandle {
    Server::bind(config).await.expect("bind").start()
}

/// Poll `check` until it holds or five seconds pass
pub async fn eventually(mut check: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + RECV_TIMEOUT;
    while !check() {
        assert!(tokio::time::Instant::now() < deadline, "condition never held");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Raw protocol client
pub struct TestClient {
    frames: Framed<TcpStream, CommandCodec>,
}

impl TestClient {
    pub async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.expect("connect");
        TestClient {
            frames: Framed::new(stream, CommandCodec::new()),
        }
    }

    /// Connect, register and swallow the welcome
    pub async fn register(addr: SocketAddr, name: &str) -> Self {
        let mut client = Self::connect(addr).await;
        client.send(Command::register_user(name).unwrap()).await;
        let welcome = client.recv().await;
        assert_eq!(welcome.kind, CommandKind::WelcomeToServer);
        client
    }

    pub async fn send(&mut self, command: Command) {
        self.frames
            .send(Outbound::Command(command))
            .await
            .expect("send");
    }

    /// Write bytes straight to the socket, bypassing the codec
    pub async fn send_raw(&mut self, bytes: &[u8]) {
        self.frames.get_mut().write_all(bytes).await.expect("raw write");
    }

    /// Next command, skipping pings
    pub async fn recv(&mut self) -> Command {
        self.try_recv(RECV_TIMEOUT)
            .await
            .expect("no command before timeout")
    }

    /// Next command within `wait`, `None` on timeout or close
    pub async fn try_recv(&mut self, wait: Duration) -> Option<Command> {
        let deadline = tokio::time::Instant::now() + wait;
        loop {
            let next = tokio::time::timeout_at(deadline, self.frames.next()).await.ok()??;
            match next.expect("frame") {
                Inbound::Ping => continue,
                Inbound::Command(command) => return Some(command),
                other => panic!("unexpected frame {other:?}"),
            }
        }
    }

    /// Whether the server closed the connection within `wait`
    pub async fn closed_within(&mut self, wait: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + wait;
        loop {
            match tokio::time::timeout_at(deadline, self.frames.next()).await {
                Err(_) => return false,
                Ok(None) | Ok(Some(Err(_))) => return true,
                Ok(Some(Ok(_))) => continue,
            }
        }
    }
}

/// Register two players, queue both and return them with their start notices
pub async fn paired(addr: SocketAddr) -> ((TestClient, Command), (TestClient, Command)) {
    let mut alice = TestClient::register(addr, "alice").await;
    let mut bob = TestClient::register(addr, "bob").await;
    alice.send(Command::looking_for_game()).await;
    bob.send(Command::looking_for_game()).await;

    let alice_start = alice.recv().await;
    let bob_start = bob.recv().await;
    assert_eq!(alice_start.kind, CommandKind::StartGameInstance);
    assert_eq!(bob_start.kind, CommandKind::StartGameInstance);
    ((alice, alice_start), (bob, bob_start))
}

/// Length-prefix `payload` the way the codec does
pub fn raw_frame(payload: &[u8]) -> Vec<u8> {
    let mut out = (payload.len() as u32).to_le_bytes().to_vec();
    out.extend_from_slice(payload);
    out
}
