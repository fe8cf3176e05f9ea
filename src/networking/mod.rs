//! Networking module - connection to the matchmaking server
//!
//! - `client` - [`ChessClient`], its background loops and the [`ClientEvent`] stream
//! - `error` - [`ClientError`] and the [`ClientResult`] alias

pub mod client;
pub mod error;

pub use client::{ChessClient, ClientConfig, ClientEvent};
pub use error::{ClientError, ClientResult};
