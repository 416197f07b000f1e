//! One connection's protocol state.
//!
//! A [`Session`] is sans-IO: the transport feeds it parsed lines with
//! [`Session::handle_line`] and drains what it wants to send from the
//! receiver returned by [`Session::new`]. Multi-line flows (CHALLENGE,
//! `grantme`) run as handler futures owned by the session; after every line
//! they are polled until they finish or park on a matcher wait.

mod oper;

use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::stream::FuturesUnordered;
use futures_util::{FutureExt, StreamExt};
use grantbot_proto::numeric::{
    RPL_ENDOFRSACHALLENGE2, RPL_ISUPPORT, RPL_RSACHALLENGE2, RPL_YOUREOPER,
};
use grantbot_proto::state::{HandshakeAction, HandshakeError, HandshakeMachine};
use grantbot_proto::{CaseMapping, Message};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::challenge::Challenge;
use crate::commands;
use crate::config::Config;
use crate::error::SessionError;
use crate::matcher::{LinePattern, Matcher};

/// Operator authentication progress once registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperState {
    Unauthenticated,
    /// CHALLENGE sent, waiting for 740/741.
    Authenticating,
    /// Terminal for the connection, whether or not CHALLENGE succeeded.
    Steady,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Registering,
    Registered(OperState),
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => f.write_str("connecting"),
            Self::Registering => f.write_str("registering"),
            Self::Registered(OperState::Unauthenticated) => f.write_str("registered"),
            Self::Registered(OperState::Authenticating) => f.write_str("authenticating"),
            Self::Registered(OperState::Steady) => f.write_str("steady"),
        }
    }
}

/// What handlers get to work with: the outgoing queue, the matcher and the
/// shared configuration.
#[derive(Clone)]
pub struct Context {
    server: Arc<str>,
    config: Arc<Config>,
    matcher: Matcher,
    outgoing: mpsc::UnboundedSender<Message>,
}

impl Context {
    pub fn new(
        server: &str,
        config: Arc<Config>,
        outgoing: mpsc::UnboundedSender<Message>,
    ) -> Self {
        let matcher = Matcher::new(config.nickname.clone());
        Self {
            server: Arc::from(server),
            config,
            matcher,
            outgoing,
        }
    }

    /// Queue a line for the server.
    pub fn send(&self, message: Message) -> Result<(), SessionError> {
        debug!(server = %self.server, "> {}", message);
        self.outgoing.send(message).map_err(|_| SessionError::Closed)
    }

    pub fn notice(&self, target: &str, text: impl Into<String>) -> Result<(), SessionError> {
        self.send(Message::notice(target, text))
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Connection name used in logs.
    pub fn server(&self) -> &str {
        &self.server
    }
}

/// How a handler future ended.
#[derive(Debug)]
pub enum Outcome {
    OperUp(Result<(), SessionError>),
    Command(Result<(), SessionError>),
}

pub struct Session {
    ctx: Context,
    state: SessionState,
    handshake: HandshakeMachine,
    handlers: FuturesUnordered<BoxFuture<'static, Outcome>>,
}

impl Session {
    pub fn new(server: &str, config: Arc<Config>) -> (Self, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handshake = HandshakeMachine::new(config.handshake());
        let session = Self {
            ctx: Context::new(server, config, tx),
            state: SessionState::Connecting,
            handshake,
            handlers: FuturesUnordered::new(),
        };
        (session, rx)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    #[cfg(test)]
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Send the registration opener.
    pub fn start(&mut self) -> Result<(), SessionError> {
        self.state = SessionState::Registering;
        let actions = self.handshake.start();
        self.apply(actions)
    }

    /// Process one inbound line.
    ///
    /// The matcher sees the line first, so a handler waiting on it is
    /// resumed in the [`Session::run_until_parked`] pass at the end.
    pub fn handle_line(&mut self, line: Message) -> Result<(), SessionError> {
        debug!(server = %self.ctx.server, "< {}", line);
        self.ctx.matcher.dispatch(&line);

        if line.is("PING") {
            self.ctx.send(Message::new("PONG", line.params))?;
        } else if line.is("ERROR") {
            let reason = line.param(0).unwrap_or("connection closed").to_string();
            return Err(SessionError::Terminated(reason));
        } else {
            match self.state {
                SessionState::Connecting => {}
                SessionState::Registering => {
                    let actions = self.handshake.feed(&line);
                    self.apply(actions)?;
                }
                SessionState::Registered(_) => self.handle_registered(line)?,
            }
        }

        self.run_until_parked();
        Ok(())
    }

    fn apply(&mut self, actions: Vec<HandshakeAction>) -> Result<(), SessionError> {
        for action in actions {
            match action {
                HandshakeAction::Send(message) => self.ctx.send(message)?,
                HandshakeAction::Complete { nickname } => {
                    info!(server = %self.ctx.server, nick = %nickname, "registered");
                    self.ctx.matcher.set_nickname(nickname);
                    self.on_registered()?;
                }
                HandshakeAction::Error(HandshakeError::ServerError(reason)) => {
                    return Err(SessionError::Terminated(reason));
                }
                HandshakeAction::Error(e) => {
                    warn!(server = %self.ctx.server, error = %e, "registration problem");
                }
            }
        }
        Ok(())
    }

    /// Start operator authentication, or skip it if the key is unusable.
    fn on_registered(&mut self) -> Result<(), SessionError> {
        self.state = SessionState::Registered(OperState::Unauthenticated);
        let oper = &self.ctx.config.oper;

        let challenge = match Challenge::open(&oper.file, &oper.pass) {
            Ok(challenge) => challenge,
            Err(e) => {
                warn!(
                    server = %self.ctx.server,
                    key = %oper.file.display(),
                    error = %e,
                    "cannot load operator key, skipping CHALLENGE"
                );
                self.state = SessionState::Registered(OperState::Steady);
                return Ok(());
            }
        };

        let replies = self.ctx.matcher.subscribe(vec![
            LinePattern::new(RPL_RSACHALLENGE2).self_nick().any(),
            LinePattern::new(RPL_ENDOFRSACHALLENGE2).self_nick(),
        ]);
        self.ctx
            .send(Message::new("CHALLENGE", [oper.name.as_str()]))?;
        self.state = SessionState::Registered(OperState::Authenticating);

        let ctx = self.ctx.clone();
        self.handlers.push(
            async move { Outcome::OperUp(oper::authenticate(ctx, challenge, replies).await) }
                .boxed(),
        );
        Ok(())
    }

    fn handle_registered(&mut self, line: Message) -> Result<(), SessionError> {
        if line.is("NICK") {
            let renamed_self = line
                .source_nickname()
                .is_some_and(|old| self.ctx.matcher.is_me(old));
            if let (true, Some(new)) = (renamed_self, line.param(0)) {
                info!(server = %self.ctx.server, nick = %new, "nickname changed");
                self.ctx.matcher.set_nickname(new);
            }
        } else if line.is(RPL_ISUPPORT) {
            self.read_isupport(&line);
        } else if line.is(RPL_YOUREOPER) {
            info!(server = %self.ctx.server, "now an IRC operator");
        } else if line.is("PRIVMSG") && line.param(0).is_some_and(|t| self.ctx.matcher.is_me(t)) {
            let ctx = self.ctx.clone();
            self.handlers
                .push(async move { Outcome::Command(commands::dispatch(ctx, line).await) }.boxed());
        }
        Ok(())
    }

    fn read_isupport(&self, line: &Message) {
        // 005 <me> TOKEN... :are supported by this server
        let tokens = line.params.iter().skip(1).take(line.params.len().saturating_sub(2));
        for token in tokens {
            let Some(value) = token.strip_prefix("CASEMAPPING=") else {
                continue;
            };
            match value.parse::<CaseMapping>() {
                Ok(casemap) => {
                    debug!(server = %self.ctx.server, casemap = %casemap, "case mapping");
                    self.ctx.matcher.set_casemap(casemap);
                }
                Err(e) => warn!(server = %self.ctx.server, error = %e, "ignoring CASEMAPPING"),
            }
        }
    }

    /// Poll handlers until none can make progress without another line.
    pub fn run_until_parked(&mut self) {
        while let Some(Some(outcome)) = self.handlers.next().now_or_never() {
            self.finish(outcome);
        }
    }

    /// Next handler to finish. `None` when there are no handlers.
    pub async fn next_outcome(&mut self) -> Option<Outcome> {
        self.handlers.next().await
    }

    /// Record a finished handler.
    pub fn finish(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::OperUp(result) => {
                if let Err(e) = result {
                    warn!(
                        server = %self.ctx.server,
                        error = %e,
                        code = e.error_code(),
                        "CHALLENGE failed"
                    );
                }
                self.state = SessionState::Registered(OperState::Steady);
            }
            Outcome::Command(Err(e)) => {
                warn!(
                    server = %self.ctx.server,
                    error = %e,
                    code = e.error_code(),
                    "command handler failed"
                );
            }
            Outcome::Command(Ok(())) => {}
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.ctx.matcher.close();
    }
}
