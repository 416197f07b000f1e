//! Handshake state machine core.

use std::collections::HashSet;

use crate::message::Message;

use super::{ConnectionState, HandshakeAction, HandshakeConfig};

/// Sans-IO state machine for client registration.
#[derive(Clone, Debug)]
pub struct HandshakeMachine {
    pub(super) config: HandshakeConfig,
    pub(super) state: ConnectionState,
    /// Capabilities acknowledged by the server.
    pub(super) enabled_caps: HashSet<String>,
    /// Capabilities the server offered.
    pub(super) available_caps: HashSet<String>,
    /// Nickname most recently sent with `NICK`.
    pub(super) nickname: String,
}

impl HandshakeMachine {
    /// Create a machine for the given parameters.
    #[must_use]
    pub fn new(config: HandshakeConfig) -> Self {
        let nickname = config.nickname.clone();
        Self {
            config,
            state: ConnectionState::Disconnected,
            enabled_caps: HashSet::new(),
            available_caps: HashSet::new(),
            nickname,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Nickname most recently attempted.
    #[must_use]
    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    /// Capabilities the server acknowledged.
    #[must_use]
    pub fn enabled_caps(&self) -> &HashSet<String> {
        &self.enabled_caps
    }

    /// Capabilities the server offered.
    #[must_use]
    pub fn available_caps(&self) -> &HashSet<String> {
        &self.available_caps
    }

    /// Begin registration.
    ///
    /// `NICK`/`USER` go out straight away; a server with CAP support holds
    /// registration until `CAP END`, one without it simply registers.
    #[must_use]
    pub fn start(&mut self) -> Vec<HandshakeAction> {
        self.state = ConnectionState::CapabilityNegotiation;
        let mut actions = Vec::new();

        if let Some(ref pass) = self.config.password {
            actions.push(HandshakeAction::Send(Message::new("PASS", [pass.as_str()])));
        }
        actions.push(HandshakeAction::Send(Message::new("CAP", ["LS", "302"])));
        actions.push(HandshakeAction::Send(Message::new(
            "NICK",
            [self.nickname.as_str()],
        )));
        actions.push(HandshakeAction::Send(Message::new(
            "USER",
            [
                self.config.username.as_str(),
                "0",
                "*",
                self.config.realname.as_str(),
            ],
        )));

        actions
    }

    /// Feed one parsed line; returns what to do about it.
    #[must_use]
    pub fn feed(&mut self, msg: &Message) -> Vec<HandshakeAction> {
        match self.state {
            ConnectionState::Disconnected
            | ConnectionState::Connected
            | ConnectionState::Terminated => return vec![],
            _ => {}
        }

        if let Some(actions) = self.handle_common(msg) {
            return actions;
        }

        match self.state {
            ConnectionState::CapabilityNegotiation => self.handle_cap_negotiation(msg),
            ConnectionState::Authenticating => self.handle_authentication(msg),
            _ => vec![],
        }
    }
}
