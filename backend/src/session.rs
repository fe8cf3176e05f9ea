//! Connection sessions
//!
//! A [`Session`] is the server's handle on one connected client: its ID,
//! display name, write half and cancellation scope.
//!
//! ## Lifecycle
//!
//! ```text
//! Connecting ──RegisterUser──> Registered ──LookingForGame──> Queued
//!      │                           │   ▲                        │
//!      │                           │   └──── paired / voided ───┘
//!      └────────── cancel (ClientDisconnecting, ping failure, shutdown) ──> Closed
//! ```
//!
//! ## Writes
//!
//! Only the session's own receive loop reads from the socket, but the ping
//! task, the lobby and the opponent's relay all write to it. Every write takes
//! the per-session writer lock, so frames never interleave.
//!
//! The scope is a child of the server's shutdown token: cancelling the server
//! cancels every session, cancelling one session touches nothing else.

use crate::error::{ServerError, ServerResult};
use crate::ids::SessionId;
use futures::SinkExt;
use parking_lot::{Mutex, RwLock};
use shared::{CommandCodec, Outbound};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::io::AsyncWrite;
use tokio::task::JoinHandle;
use tokio_util::codec::FramedWrite;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Any byte sink a session can write frames to
pub type SessionWriter = Box<dyn AsyncWrite + Send + Unpin>;

pub struct Session {
    id: SessionId,
    peer: SocketAddr,
    name: RwLock<Option<String>>,
    writer: tokio::sync::Mutex<FramedWrite<SessionWriter, CommandCodec>>,
    scope: CancellationToken,
    write_timeout: Duration,
    queued: AtomicBool,
    torn_down: AtomicBool,
    ping_task: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("peer", &self.peer)
            .field("name", &*self.name.read())
            .field("cancelled", &self.scope.is_cancelled())
            .finish()
    }
}

impl Session {
    pub fn new(
        id: SessionId,
        peer: SocketAddr,
        writer: SessionWriter,
        scope: CancellationToken,
        write_timeout: Duration,
    ) -> Self {
        Session {
            id,
            peer,
            name: RwLock::new(None),
            writer: tokio::sync::Mutex::new(FramedWrite::new(writer, CommandCodec::new())),
            scope,
            write_timeout,
            queued: AtomicBool::new(false),
            torn_down: AtomicBool::new(false),
            ping_task: Mutex::new(None),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Name given in `RegisterUser`, if any
    pub fn name(&self) -> Option<String> {
        self.name.read().clone()
    }

    /// Name for notices and logs; falls back to `Player <id>`
    pub fn display_name(&self) -> String {
        self.name()
            .unwrap_or_else(|| format!("Player {}", self.id))
    }

    pub fn is_registered(&self) -> bool {
        self.name.read().is_some()
    }

    /// Set the display name. Returns `false` if one was already set.
    pub fn register(&self, name: &str) -> bool {
        let mut slot = self.name.write();
        if slot.is_some() {
            return false;
        }
        *slot = Some(name.trim().to_string());
        true
    }

    // ========================================================================
    // Cancellation
    // ========================================================================

    pub fn scope(&self) -> &CancellationToken {
        &self.scope
    }

    pub fn cancel(&self) {
        self.scope.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.scope.is_cancelled() || self.torn_down.load(Ordering::Acquire)
    }

    /// Claim the one teardown this session gets; `false` if already claimed
    pub(crate) fn begin_teardown(&self) -> bool {
        !self.torn_down.swap(true, Ordering::AcqRel)
    }

    // ========================================================================
    // Lobby flag
    // ========================================================================

    /// Mark as waiting in the lobby; `false` if it already was
    pub(crate) fn mark_queued(&self) -> bool {
        self.queued
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn unmark_queued(&self) {
        self.queued.store(false, Ordering::Release);
    }

    pub fn is_queued(&self) -> bool {
        self.queued.load(Ordering::Acquire)
    }

    // ========================================================================
    // Ping task
    // ========================================================================

    pub(crate) fn set_ping_task(&self, handle: JoinHandle<()>) {
        *self.ping_task.lock() = Some(handle);
    }

    pub(crate) fn take_ping_task(&self) -> Option<JoinHandle<()>> {
        self.ping_task.lock().take()
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Send one frame, aborting if the session's scope is cancelled
    pub async fn send(&self, item: impl Into<Outbound>) -> ServerResult<()> {
        self.send_with_attempts(item.into(), 1).await
    }

    /// Send one frame, retrying the flush up to `attempts` times
    ///
    /// The frame is encoded once; retries only push out what is still
    /// buffered, so a retry never duplicates a frame.
    pub async fn send_with_attempts(&self, item: Outbound, attempts: u32) -> ServerResult<()> {
        if self.scope.is_cancelled() {
            return Err(ServerError::SessionClosed { session: self.id });
        }
        tokio::select! {
            _ = self.scope.cancelled() => Err(ServerError::SessionClosed { session: self.id }),
            result = self.write(item, attempts) => result,
        }
    }

    /// Send ignoring the scope, bounded by the write timeout
    ///
    /// Used for the last notice of a session that is already being closed.
    pub async fn send_final(&self, item: impl Into<Outbound>) -> ServerResult<()> {
        self.write(item.into(), 1).await
    }

    /// Liveness probe: a zero-length frame that must leave within the timeout
    pub async fn ping(&self) -> bool {
        if self.is_closed() {
            return false;
        }
        match self.send(Outbound::Ping).await {
            Ok(()) => true,
            Err(e) => {
                debug!("[SESSION] Ping to session {} failed: {}", self.id, e);
                false
            }
        }
    }

    /// Flush and shut down the write half
    pub(crate) async fn close(&self) {
        let mut writer = self.writer.lock().await;
        match tokio::time::timeout(self.write_timeout, writer.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!("[SESSION] Closing session {}: {}", self.id, e),
            Err(_) => debug!("[SESSION] Closing session {} timed out", self.id),
        }
    }

    async fn write(&self, item: Outbound, attempts: u32) -> ServerResult<()> {
        let timed_out = ServerError::WriteTimeout {
            session: self.id,
            timeout: self.write_timeout,
        };
        let mut writer = self.writer.lock().await;

        match tokio::time::timeout(self.write_timeout, writer.feed(item)).await {
            Ok(result) => result?,
            Err(_) => return Err(timed_out),
        }

        let mut last_error = timed_out;
        for attempt in 1..=attempts.max(1) {
            match tokio::time::timeout(self.write_timeout, writer.flush()).await {
                Ok(Ok(())) => return Ok(()),
                Ok(Err(e)) => last_error = e.into(),
                Err(_) => {
                    last_error = ServerError::WriteTimeout {
                        session: self.id,
                        timeout: self.write_timeout,
                    }
                }
            }
            if attempt < attempts {
                warn!(
                    "[SESSION] Write to session {} failed (attempt {}/{}): {}",
                    self.id, attempt, attempts, last_error
                );
            }
        }
        Err(last_error)
    }
}
