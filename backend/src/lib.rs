//! # Chess game server
//!
//! Accepts TCP clients speaking the length-prefixed command protocol from the
//! `shared` crate, pairs them through a matchmaking lobby and relays moves
//! between the two sides of each game.
//!
//! ## Module Organization
//!
//! - `config` - [`ServerConfig`] and its environment layer
//! - `error` - [`ServerError`]
//! - `ids` - Session and game ID allocation
//! - `session` - One connected client and its serialized writer
//! - `lobby` - Waiting queue and the pairing loop
//! - `game` - [`TrackedGame`]: two sessions bound to one match
//! - `server` - Accept loop, dispatch, teardown and shutdown
//!
//! # Examples
//!
//! ```rust,ignore
//! let server = Server::bind(ServerConfig::default()).await?;
//! let handle = server.start();
//! tokio::signal::ctrl_c().await?;
//! handle.shutdown().await;
//! ```

pub mod config;
pub mod error;
pub mod game;
pub mod ids;
pub mod lobby;
pub mod server;
pub mod session;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use game::TrackedGame;
pub use server::{Server, ServerHandle};
