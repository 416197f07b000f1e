//! Tokio codec framing IRC lines into [`Message`]s.

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{self, ProtocolError};
use crate::message::Message;

/// Maximum accepted line length, tags included.
pub const MAX_IRC_LINE_LEN: usize = 8191;

/// Line codec for a client connection.
///
/// Decoding is forgiving: invalid UTF-8 is replaced rather than rejected,
/// and lines that do not parse are logged and skipped, since a decoder
/// error ends the framed stream.
pub struct IrcCodec {
    /// Index of the next byte to check for a newline.
    next_index: usize,
    max_len: usize,
}

impl IrcCodec {
    /// Codec with the default line limit.
    pub fn new() -> Self {
        Self::with_max_len(MAX_IRC_LINE_LEN)
    }

    /// Codec with a custom line limit in bytes.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            next_index: 0,
            max_len,
        }
    }

    /// Reject outgoing lines that would smuggle a second command.
    fn check_outgoing(line: &str) -> error::Result<()> {
        match line.chars().find(|c| matches!(c, '\r' | '\n' | '\0')) {
            Some(c) => Err(ProtocolError::IllegalCharacter(c)),
            None => Ok(()),
        }
    }
}

impl Default for IrcCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for IrcCodec {
    type Item = Message;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> error::Result<Option<Message>> {
        loop {
            let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') else {
                self.next_index = src.len();
                if src.len() > self.max_len {
                    return Err(ProtocolError::MessageTooLong {
                        actual: src.len(),
                        limit: self.max_len,
                    });
                }
                return Ok(None);
            };

            let line = src.split_to(self.next_index + offset + 1);
            self.next_index = 0;

            if line.len() > self.max_len {
                return Err(ProtocolError::MessageTooLong {
                    actual: line.len(),
                    limit: self.max_len,
                });
            }

            let text = String::from_utf8_lossy(&line);
            let text = text.trim_end_matches(['\r', '\n']);
            if text.is_empty() {
                continue;
            }

            match Message::parse(text) {
                Ok(msg) => return Ok(Some(msg)),
                Err(e) => {
                    tracing::debug!(error = %e, line = %text, "Skipping unparsable line");
                }
            }
        }
    }
}

impl Encoder<Message> for IrcCodec {
    type Error = ProtocolError;

    fn encode(&mut self, msg: Message, dst: &mut BytesMut) -> error::Result<()> {
        let line = msg.to_string();
        Self::check_outgoing(&line)?;
        dst.reserve(line.len() + 2);
        dst.put_slice(line.as_bytes());
        dst.put_slice(b"\r\n");
        Ok(())
    }
}
