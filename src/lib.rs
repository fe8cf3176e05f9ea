//! # netchess client
//!
//! Connects to the matchmaking server, mirrors each match on a local
//! [`chess_engine::GameSession`] and exposes it to a front end.
//!
//! ```text
//! ChessClient ──ClientEvent──> OnlineGame::apply_event ──GameUpdate──> UI
//!      ▲                                                                │
//!      └──────────────── OnlineGame::submit_move <──── player input ────┘
//! ```

pub mod game;
pub mod networking;

pub use game::{GameUpdate, OnlineGame};
pub use networking::{ChessClient, ClientConfig, ClientError, ClientEvent, ClientResult};
