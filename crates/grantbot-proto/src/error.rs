//! Error types for the IRC protocol crate.

use thiserror::Error;

/// Convenience type alias for Results using [`ProtocolError`].
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Errors raised by the line codec.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// I/O error during reading or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A line exceeded the codec's maximum length.
    #[error("line too long: {actual} bytes (limit {limit})")]
    MessageTooLong {
        /// Length of the offending line (or partial line) in bytes.
        actual: usize,
        /// Configured limit.
        limit: usize,
    },

    /// An outgoing message contained a line break or NUL.
    #[error("illegal character {0:?} in outgoing line")]
    IllegalCharacter(char),
}

/// Errors raised while parsing a single IRC line.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MessageParseError {
    /// The line was empty (or only whitespace).
    #[error("empty message")]
    EmptyMessage,

    /// The command token was missing or not `1*letter / 3digit`.
    #[error("invalid command at position {position} in {line:?}")]
    InvalidCommand {
        /// The offending line.
        line: String,
        /// Byte offset where the command was expected.
        position: usize,
    },

    /// A source prefix was present but empty.
    #[error("invalid source prefix: {0:?}")]
    InvalidPrefix(String),
}
