//! Server configuration
//!
//! Values come from three layers, later ones winning:
//!
//! 1. [`ServerConfig::default`]
//! 2. Environment (a `.env` file is loaded first if present):
//!
//!    | Variable                    | Field                 | Format            |
//!    |-----------------------------|-----------------------|-------------------|
//!    | `CHESS_LISTEN_ADDR`         | `listen_addr`         | `host:port`       |
//!    | `CHESS_MAX_CONNECTIONS`     | `max_connections`     | integer           |
//!    | `CHESS_PING_INTERVAL`       | `ping_interval`       | humantime (`15s`) |
//!    | `CHESS_LOBBY_POLL_INTERVAL` | `lobby_poll_interval` | humantime         |
//!    | `CHESS_RELAY_ATTEMPTS`      | `relay_attempts`      | integer           |
//!    | `CHESS_NOTICE_TIMEOUT`      | `notice_timeout`      | humantime         |
//!
//! 3. Command-line flags parsed in the binary

use crate::error::{ServerError, ServerResult};
use std::net::{Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 13000;

/// Configuration for the game server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address the listener binds. Default: 127.0.0.1:13000.
    pub listen_addr: SocketAddr,
    /// Connections beyond this count get `ServerFull` and are closed. Default: 20.
    pub max_connections: usize,
    /// Gap between liveness pings on each session. Default: 15s.
    pub ping_interval: Duration,
    /// Lobby sleep when fewer than two players wait. Default: 750ms.
    pub lobby_poll_interval: Duration,
    /// Flush attempts when relaying a move before the opponent is given up on. Default: 3.
    pub relay_attempts: u32,
    /// Upper bound on any single write, including the final notices. Default: 2s.
    pub notice_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            listen_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
            max_connections: 20,
            ping_interval: Duration::from_secs(15),
            lobby_poll_interval: Duration::from_millis(750),
            relay_attempts: 3,
            notice_timeout: Duration::from_secs(2),
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `CHESS_*` variables from the process environment
    pub fn from_env() -> ServerResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each `CHESS_*` key
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ServerResult<Self> {
        let mut config = ServerConfig::default();

        if let Some(v) = lookup("CHESS_LISTEN_ADDR") {
            config.listen_addr = parse_value("CHESS_LISTEN_ADDR", &v)?;
        }
        if let Some(v) = lookup("CHESS_MAX_CONNECTIONS") {
            config.max_connections = parse_value("CHESS_MAX_CONNECTIONS", &v)?;
        }
        if let Some(v) = lookup("CHESS_PING_INTERVAL") {
            config.ping_interval = parse_duration("CHESS_PING_INTERVAL", &v)?;
        }
        if let Some(v) = lookup("CHESS_LOBBY_POLL_INTERVAL") {
            config.lobby_poll_interval = parse_duration("CHESS_LOBBY_POLL_INTERVAL", &v)?;
        }
        if let Some(v) = lookup("CHESS_RELAY_ATTEMPTS") {
            config.relay_attempts = parse_value("CHESS_RELAY_ATTEMPTS", &v)?;
        }
        if let Some(v) = lookup("CHESS_NOTICE_TIMEOUT") {
            config.notice_timeout = parse_duration("CHESS_NOTICE_TIMEOUT", &v)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject values the server cannot run with
    pub fn validate(&self) -> ServerResult<()> {
        let invalid = |key: &str, message: &str| -> ServerResult<()> {
            Err(ServerError::Config {
                key: key.to_string(),
                message: message.to_string(),
            })
        };

        if self.max_connections == 0 {
            return invalid("max_connections", "must be at least 1");
        }
        if self.relay_attempts == 0 {
            return invalid("relay_attempts", "must be at least 1");
        }
        if self.ping_interval.is_zero() {
            return invalid("ping_interval", "must be non-zero");
        }
        if self.lobby_poll_interval.is_zero() {
            return invalid("lobby_poll_interval", "must be non-zero");
        }
        if self.notice_timeout.is_zero() {
            return invalid("notice_timeout", "must be non-zero");
        }
        Ok(())
    }
}

fn parse_value<T>(key: &str, raw: &str) -> ServerResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ServerError::Config {
        key: key.to_string(),
        message: e.to_string(),
    })
}

fn parse_duration(key: &str, raw: &str) -> ServerResult<Duration> {
    humantime::parse_duration(raw.trim()).map_err(|e| ServerError::Config {
        key: key.to_string(),
        message: e.to_string(),
    })
}
