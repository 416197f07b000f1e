//! Sans-IO registration state machine.
//!
//! Drives a client from a freshly opened socket to the welcome numeric:
//! `PASS`, `CAP LS 302`, optional SASL PLAIN, `NICK`/`USER`, `CAP END`.
//! It performs no I/O: feed it parsed lines, send whatever it returns.
//!
//! # Example
//!
//! ```
//! use grantbot_proto::state::{HandshakeAction, HandshakeConfig, HandshakeMachine};
//! use grantbot_proto::Message;
//!
//! let mut machine = HandshakeMachine::new(HandshakeConfig {
//!     nickname: "grantbot".to_string(),
//!     username: "grantbot".to_string(),
//!     realname: "grantbot".to_string(),
//!     password: None,
//!     sasl_credentials: None,
//! });
//!
//! // PASS (if any), CAP LS 302, NICK, USER
//! let opener = machine.start();
//! assert_eq!(opener.len(), 3);
//!
//! let welcome: Message = ":srv 001 grantbot :Welcome".parse().unwrap();
//! let actions = machine.feed(&welcome);
//! assert!(matches!(&actions[0], HandshakeAction::Complete { nickname } if nickname == "grantbot"));
//! ```

mod tracker;
mod transitions;

pub use tracker::HandshakeMachine;

use thiserror::Error;

use crate::Message;

/// Where the connection is in the registration flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Not started.
    #[default]
    Disconnected,
    /// Sent `CAP LS`, awaiting the capability list.
    CapabilityNegotiation,
    /// SASL exchange in progress.
    Authenticating,
    /// Capability negotiation over, awaiting the welcome numeric.
    Registering,
    /// Welcome received.
    Connected,
    /// Server sent `ERROR`.
    Terminated,
}

/// Registration parameters.
#[derive(Clone, Debug)]
pub struct HandshakeConfig {
    /// Desired nickname.
    pub nickname: String,
    /// Username (ident).
    pub username: String,
    /// Real name / GECOS.
    pub realname: String,
    /// Connection password sent with `PASS`.
    pub password: Option<String>,
    /// SASL PLAIN credentials; `sasl` is only requested when present.
    pub sasl_credentials: Option<SaslCredentials>,
}

/// SASL PLAIN credentials.
#[derive(Clone, Debug)]
pub struct SaslCredentials {
    /// Account name.
    pub account: String,
    /// Account password.
    pub password: String,
}

/// Something the caller must do after feeding a line.
#[derive(Clone, Debug, PartialEq)]
pub enum HandshakeAction {
    /// Send this message to the server.
    Send(Message),
    /// Registration finished; `nickname` is the one the server confirmed.
    Complete {
        /// Nickname from the welcome numeric.
        nickname: String,
    },
    /// Something went wrong. Only [`HandshakeError::ServerError`] is fatal;
    /// the machine carries on after the others.
    Error(HandshakeError),
}

/// Problems reported during registration.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum HandshakeError {
    /// Server refused the requested capabilities.
    #[error("capability rejected: {}", .0.join(", "))]
    CapabilityRejected(Vec<String>),
    /// SASL authentication failed; registration continues unauthenticated.
    #[error("SASL authentication failed: {0}")]
    SaslFailed(String),
    /// Nickname taken or invalid; an alternative was tried.
    #[error("nickname in use: {0}")]
    NicknameInUse(String),
    /// Server sent `ERROR`.
    #[error("server error: {0}")]
    ServerError(String),
}
