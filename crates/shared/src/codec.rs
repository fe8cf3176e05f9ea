//! Length-prefixed JSON framing
//!
//! Each frame is a 4-byte little-endian length followed by exactly that many
//! bytes of UTF-8 JSON holding one [`Command`]. A zero-length frame is a
//! liveness ping and carries no payload.
//!
//! ```text
//! +----------------+---------------------------+
//! | len: u32 (LE)  | JSON payload (len bytes)  |
//! +----------------+---------------------------+
//! ```
//!
//! Partial reads are handled by [`LengthDelimitedCodec`]: a frame is only
//! yielded once the whole payload has arrived. A payload that doesn't parse is
//! handed up as [`Inbound::Malformed`] and the stream carries on with the next
//! prefix. A prefix above [`MAX_FRAME_LENGTH`] is skipped the same way: its
//! payload is drained as it arrives, never buffered, and then reported as
//! [`Inbound::Malformed`].

use crate::protocol::{Command, ProtocolError};
use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder, LengthDelimitedCodec};

/// Largest payload accepted in either direction
pub const MAX_FRAME_LENGTH: usize = 1024 * 1024;

/// A decoded frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// Zero-length liveness probe
    Ping,
    Command(Command),
    /// Well-formed JSON whose kind is missing a required field
    Invalid {
        command: Command,
        error: ProtocolError,
    },
    /// Payload that is not a command at all; already discarded
    Malformed { reason: String },
}

/// A frame to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Ping,
    Command(Command),
}

impl From<Command> for Outbound {
    fn from(command: Command) -> Self {
        Outbound::Command(command)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Socket failure
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize command: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type CodecResult<T> = Result<T, CodecError>;

/// [`Decoder`]/[`Encoder`] pair for the command stream
#[derive(Debug)]
pub struct CommandCodec {
    frames: LengthDelimitedCodec,
    /// Payload bytes of an oversized frame still to be dropped
    discarding: usize,
    /// Declared length of the frame being dropped
    discarded_len: usize,
}

const HEADER_LENGTH: usize = 4;

impl CommandCodec {
    pub fn new() -> Self {
        CommandCodec {
            frames: LengthDelimitedCodec::builder()
                .length_field_length(HEADER_LENGTH)
                .little_endian()
                .max_frame_length(MAX_FRAME_LENGTH)
                .new_codec(),
            discarding: 0,
            discarded_len: 0,
        }
    }
}

impl Default for CommandCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for CommandCodec {
    type Item = Inbound;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> CodecResult<Option<Inbound>> {
        if self.discarding > 0 {
            let n = self.discarding.min(src.len());
            src.advance(n);
            self.discarding -= n;
            if self.discarding > 0 {
                return Ok(None);
            }
            return Ok(Some(Inbound::Malformed {
                reason: format!(
                    "frame of {} bytes exceeds the {} byte limit",
                    self.discarded_len, MAX_FRAME_LENGTH
                ),
            }));
        }

        // Only hand whole frames to the inner codec so it never holds a
        // half-read header across calls.
        if src.len() < HEADER_LENGTH {
            return Ok(None);
        }
        let len = u32::from_le_bytes([src[0], src[1], src[2], src[3]]) as usize;
        if len > MAX_FRAME_LENGTH {
            src.advance(HEADER_LENGTH);
            self.discarding = len;
            self.discarded_len = len;
            return self.decode(src);
        }
        if src.len() < HEADER_LENGTH + len {
            src.reserve(HEADER_LENGTH + len - src.len());
            return Ok(None);
        }

        let Some(frame) = self.frames.decode(src)? else {
            return Ok(None);
        };
        if frame.is_empty() {
            return Ok(Some(Inbound::Ping));
        }

        let inbound = match serde_json::from_slice::<Command>(&frame) {
            Ok(command) => match command.validate() {
                Ok(()) => Inbound::Command(command),
                Err(error) => Inbound::Invalid { command, error },
            },
            Err(e) => Inbound::Malformed {
                reason: e.to_string(),
            },
        };
        Ok(Some(inbound))
    }
}

impl Encoder<Outbound> for CommandCodec {
    type Error = CodecError;

    fn encode(&mut self, item: Outbound, dst: &mut BytesMut) -> CodecResult<()> {
        let payload = match item {
            Outbound::Ping => Bytes::new(),
            Outbound::Command(command) => Bytes::from(serde_json::to_vec(&command)?),
        };
        self.frames.encode(payload, dst)?;
        Ok(())
    }
}
