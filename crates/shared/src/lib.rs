//! Wire protocol shared by the server and the client
//!
//! - [`protocol`] defines the [`Command`] envelope and its validation rules
//! - [`codec`] frames commands on a byte stream ([`CommandCodec`])

pub mod codec;
pub mod protocol;

pub use codec::{CodecError, CodecResult, CommandCodec, Inbound, Outbound, MAX_FRAME_LENGTH};
pub use protocol::{Command, CommandKind, GameId, ProtocolError, ProtocolResult};
