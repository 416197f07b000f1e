//! Unified error handling for grantbot.
//!
//! Nothing here is fatal to the process. Key problems skip operator
//! authentication, connection problems trigger a reconnect, and denied
//! requests are answered with a notice rather than raised at all.

use std::path::PathBuf;

use grantbot_proto::ProtocolError;
use thiserror::Error;

// ============================================================================
// Challenge errors
// ============================================================================

/// The operator key could not be loaded. Authentication is skipped for the
/// connection attempt.
#[derive(Debug, Error)]
pub enum KeyLoadError {
    #[error("failed to read key file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode private key: {0}")]
    Decode(String),

    #[error("unsupported PEM encryption: {0}")]
    UnsupportedCipher(String),
}

/// Errors from the CHALLENGE exchange.
#[derive(Debug, Error)]
pub enum ChallengeError {
    #[error("key load failed: {0}")]
    KeyLoad(#[from] KeyLoadError),

    #[error("challenge is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("failed to decrypt challenge: {0}")]
    Decrypt(#[from] rsa::Error),
}

// ============================================================================
// Session errors
// ============================================================================

/// A matcher wait ended without a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WaitError {
    /// The connection went away while waiting.
    #[error("connection closed while waiting")]
    Closed,

    /// A wait needs at least one pattern.
    #[error("no patterns to wait for")]
    NoPatterns,
}

/// Errors surfaced by session handlers.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("outgoing queue closed")]
    Closed,

    #[error("server closed the session: {0}")]
    Terminated(String),

    #[error(transparent)]
    Wait(#[from] WaitError),

    #[error(transparent)]
    Challenge(#[from] ChallengeError),
}

impl SessionError {
    /// Get a static error code string for log labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Terminated(_) => "terminated",
            Self::Wait(WaitError::Closed) => "wait_closed",
            Self::Wait(WaitError::NoPatterns) => "wait_no_patterns",
            Self::Challenge(ChallengeError::KeyLoad(_)) => "key_load_failed",
            Self::Challenge(_) => "challenge_failed",
        }
    }
}

// ============================================================================
// Connection errors
// ============================================================================

/// Errors that end one connection attempt.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("invalid TLS server name: {0}")]
    ServerName(String),

    #[error(transparent)]
    Session(#[from] SessionError),
}
