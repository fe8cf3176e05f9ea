//! Game module - the player's side of an online match
//!
//! Rules live in `chess_engine`; this module connects them to the network.
//!
//! - `online` - [`OnlineGame`], the local mirror a front end renders from,
//!   and [`GameUpdate`], what changed after a server event

pub mod online;

pub use online::{parse_coordinate_move, GameUpdate, OnlineGame};
