//! State transition handlers for each registration phase.

use crate::message::Message;
use crate::numeric::{
    is_sasl_failure, ERR_ERRONEUSNICKNAME, ERR_NICKNAMEINUSE, ERR_UNKNOWNCOMMAND,
    RPL_SASLSUCCESS, RPL_WELCOME,
};
use crate::sasl;

use super::tracker::HandshakeMachine;
use super::{ConnectionState, HandshakeAction, HandshakeError};

impl HandshakeMachine {
    /// Lines that mean the same thing in every pre-registration state.
    pub(super) fn handle_common(&mut self, msg: &Message) -> Option<Vec<HandshakeAction>> {
        if msg.is("ERROR") {
            let reason = msg.param(0).unwrap_or("connection closed").to_string();
            self.state = ConnectionState::Terminated;
            return Some(vec![HandshakeAction::Error(HandshakeError::ServerError(
                reason,
            ))]);
        }

        match msg.command.as_str() {
            RPL_WELCOME => {
                if let Some(nick) = msg.param(0) {
                    self.nickname = nick.to_string();
                }
                self.state = ConnectionState::Connected;
                Some(vec![HandshakeAction::Complete {
                    nickname: self.nickname.clone(),
                }])
            }
            ERR_NICKNAMEINUSE | ERR_ERRONEUSNICKNAME => {
                let rejected = msg.param(1).unwrap_or(&self.nickname).to_string();
                self.nickname = format!("{}_", self.nickname);
                Some(vec![
                    HandshakeAction::Error(HandshakeError::NicknameInUse(rejected)),
                    HandshakeAction::Send(Message::new("NICK", [self.nickname.as_str()])),
                ])
            }
            ERR_UNKNOWNCOMMAND if msg.param(1).is_some_and(|c| c.eq_ignore_ascii_case("CAP")) => {
                // No CAP support: NICK/USER are already out, just wait for 001.
                self.state = ConnectionState::Registering;
                Some(vec![])
            }
            _ => None,
        }
    }

    pub(super) fn handle_cap_negotiation(&mut self, msg: &Message) -> Vec<HandshakeAction> {
        if !msg.is("CAP") {
            return vec![];
        }

        let subcommand = msg.param(1).unwrap_or("");
        match subcommand.to_ascii_uppercase().as_str() {
            "LS" => {
                let (is_multiline, caps) = if msg.param(2) == Some("*") {
                    (true, msg.param(3).unwrap_or(""))
                } else {
                    (false, msg.param(2).unwrap_or(""))
                };

                for cap in caps.split_whitespace() {
                    let name = cap.split('=').next().unwrap_or(cap);
                    self.available_caps.insert(name.to_string());
                }

                if is_multiline {
                    return vec![];
                }

                if self.wants_sasl() && self.available_caps.contains("sasl") {
                    vec![HandshakeAction::Send(Message::new("CAP", ["REQ", "sasl"]))]
                } else {
                    self.finish_cap_negotiation()
                }
            }
            "ACK" => {
                for cap in msg.param(2).unwrap_or("").split_whitespace() {
                    if !cap.starts_with('-') {
                        self.enabled_caps
                            .insert(cap.trim_start_matches(['~', '=']).to_string());
                    }
                }

                if self.wants_sasl() && self.enabled_caps.contains("sasl") {
                    self.state = ConnectionState::Authenticating;
                    vec![HandshakeAction::Send(Message::new(
                        "AUTHENTICATE",
                        ["PLAIN"],
                    ))]
                } else {
                    self.finish_cap_negotiation()
                }
            }
            "NAK" => {
                let rejected = msg
                    .param(2)
                    .unwrap_or("")
                    .split_whitespace()
                    .map(String::from)
                    .collect();
                let mut actions = vec![HandshakeAction::Error(
                    HandshakeError::CapabilityRejected(rejected),
                )];
                actions.extend(self.finish_cap_negotiation());
                actions
            }
            _ => vec![],
        }
    }

    pub(super) fn handle_authentication(&mut self, msg: &Message) -> Vec<HandshakeAction> {
        if msg.is("AUTHENTICATE") {
            if msg.param(0) != Some("+") {
                return vec![];
            }
            let Some(ref creds) = self.config.sasl_credentials else {
                return vec![];
            };
            let payload = sasl::encode_plain(&creds.account, &creds.password);
            return sasl::chunk_response(&payload)
                .into_iter()
                .map(|chunk| HandshakeAction::Send(Message::new("AUTHENTICATE", [chunk])))
                .collect();
        }

        if msg.command == RPL_SASLSUCCESS {
            return self.finish_cap_negotiation();
        }

        if is_sasl_failure(&msg.command) {
            let reason = msg
                .params
                .last()
                .map(String::as_str)
                .unwrap_or("unknown error")
                .to_string();
            let mut actions = vec![HandshakeAction::Error(HandshakeError::SaslFailed(reason))];
            actions.extend(self.finish_cap_negotiation());
            return actions;
        }

        vec![]
    }

    pub(super) fn finish_cap_negotiation(&mut self) -> Vec<HandshakeAction> {
        self.state = ConnectionState::Registering;
        vec![HandshakeAction::Send(Message::new("CAP", ["END"]))]
    }

    fn wants_sasl(&self) -> bool {
        self.config.sasl_credentials.is_some()
    }
}
