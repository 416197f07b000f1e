//! Reply correlation over the inbound line stream.
//!
//! IRC has no request ids. A handler that sends `WHOIS alice` learns about
//! the answer only by recognising lines shaped like the answer, which may be
//! interleaved with anything else the server feels like sending. The
//! [`Matcher`] keeps a table of pending waits, each a set of
//! [`LinePattern`]s. Every inbound line is offered to every wait before the
//! session looks at it.
//!
//! Waits are registered when [`Matcher::wait_for`] or [`Matcher::subscribe`]
//! is called, not when the returned future is first polled, so a request can
//! be sent after registering without racing its reply.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use grantbot_proto::{CaseMapping, Message};
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};

use crate::error::WaitError;

/// How one parameter position is matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamMatch {
    /// Any value, as long as the position exists.
    Any,
    /// The bot's current nickname, case-folded.
    SelfNick,
    /// This string, case-folded.
    Folded(String),
}

/// A command token plus per-position parameter matchers.
///
/// ```text
/// // 318 <me> alice :End of /WHOIS list.
/// LinePattern::new("318").self_nick().folded("alice")
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinePattern {
    command: String,
    params: Vec<ParamMatch>,
}

impl LinePattern {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            params: Vec::new(),
        }
    }

    #[must_use]
    pub fn any(self) -> Self {
        self.param(ParamMatch::Any)
    }

    #[must_use]
    pub fn self_nick(self) -> Self {
        self.param(ParamMatch::SelfNick)
    }

    #[must_use]
    pub fn folded(self, value: impl Into<String>) -> Self {
        self.param(ParamMatch::Folded(value.into()))
    }

    #[must_use]
    pub fn param(mut self, matcher: ParamMatch) -> Self {
        self.params.push(matcher);
        self
    }

    /// Whether `line` fits this pattern. Parameters past the ones the
    /// pattern names are ignored; a line with fewer never matches.
    pub fn matches(&self, line: &Message, nickname: &str, casemap: CaseMapping) -> bool {
        if !line.is(&self.command) || line.params.len() < self.params.len() {
            return false;
        }

        self.params
            .iter()
            .zip(&line.params)
            .all(|(expected, actual)| match expected {
                ParamMatch::Any => true,
                ParamMatch::SelfNick => casemap.equals(actual, nickname),
                ParamMatch::Folded(value) => casemap.equals(actual, value),
            })
    }
}

enum Sink {
    Once(Option<oneshot::Sender<Message>>),
    Stream(mpsc::UnboundedSender<Message>),
}

impl Sink {
    fn is_closed(&self) -> bool {
        match self {
            Sink::Once(Some(tx)) => tx.is_closed(),
            Sink::Once(None) => true,
            Sink::Stream(tx) => tx.is_closed(),
        }
    }

    /// Hand over a line. Returns whether it was taken and whether the wait
    /// stays registered.
    fn deliver(&mut self, line: &Message) -> (bool, bool) {
        match self {
            Sink::Once(tx) => {
                let sent = tx.take().is_some_and(|tx| tx.send(line.clone()).is_ok());
                (sent, false)
            }
            Sink::Stream(tx) => {
                let sent = tx.send(line.clone()).is_ok();
                (sent, sent)
            }
        }
    }
}

struct Waiter {
    patterns: Vec<LinePattern>,
    sink: Sink,
}

struct Inner {
    nickname: String,
    casemap: CaseMapping,
    waiters: Vec<Waiter>,
    closed: bool,
}

/// Per-connection table of pending waits. Cheap to clone; clones share the
/// table.
#[derive(Clone)]
pub struct Matcher {
    inner: Arc<Mutex<Inner>>,
}

impl Matcher {
    pub fn new(nickname: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                nickname: nickname.into(),
                casemap: CaseMapping::default(),
                waiters: Vec::new(),
                closed: false,
            })),
        }
    }

    /// Current nickname used for [`ParamMatch::SelfNick`].
    #[cfg(test)]
    pub fn nickname(&self) -> String {
        self.inner.lock().nickname.clone()
    }

    pub fn set_nickname(&self, nickname: impl Into<String>) {
        self.inner.lock().nickname = nickname.into();
    }

    #[cfg(test)]
    pub fn casemap(&self) -> CaseMapping {
        self.inner.lock().casemap
    }

    pub fn set_casemap(&self, casemap: CaseMapping) {
        self.inner.lock().casemap = casemap;
    }

    /// Whether `name` is the bot's current nickname.
    pub fn is_me(&self, name: &str) -> bool {
        let inner = self.inner.lock();
        inner.casemap.equals(name, &inner.nickname)
    }

    /// Resolve with the first line matching any of `patterns`.
    ///
    /// An empty pattern set resolves straight away with
    /// [`WaitError::NoPatterns`].
    pub fn wait_for(&self, patterns: Vec<LinePattern>) -> Wait {
        if patterns.is_empty() {
            return Wait { rx: None };
        }
        let (tx, rx) = oneshot::channel();
        self.register(patterns, Sink::Once(Some(tx)));
        Wait { rx: Some(rx) }
    }

    /// Receive every line matching any of `patterns` until the subscription
    /// is dropped.
    pub fn subscribe(&self, patterns: Vec<LinePattern>) -> Subscription {
        if patterns.is_empty() {
            return Subscription { rx: None };
        }
        let (tx, rx) = mpsc::unbounded_channel();
        self.register(patterns, Sink::Stream(tx));
        Subscription { rx: Some(rx) }
    }

    fn register(&self, patterns: Vec<LinePattern>, sink: Sink) {
        let mut inner = self.inner.lock();
        // Dropping the sink right away resolves the wait as closed.
        if !inner.closed {
            inner.waiters.push(Waiter { patterns, sink });
        }
    }

    /// Offer `line` to every pending wait. Returns how many took it.
    pub fn dispatch(&self, line: &Message) -> usize {
        let mut guard = self.inner.lock();
        let Inner {
            nickname,
            casemap,
            waiters,
            ..
        } = &mut *guard;

        let mut delivered = 0;
        waiters.retain_mut(|waiter| {
            if waiter.sink.is_closed() {
                return false;
            }
            if !waiter
                .patterns
                .iter()
                .any(|p| p.matches(line, nickname, *casemap))
            {
                return true;
            }
            let (sent, keep) = waiter.sink.deliver(line);
            if sent {
                delivered += 1;
            }
            keep
        });
        delivered
    }

    /// Number of registered waits, abandoned ones included until the next
    /// dispatch prunes them.
    #[cfg(test)]
    pub fn pending(&self) -> usize {
        self.inner.lock().waiters.len()
    }

    /// Drop every pending wait; they resolve with [`WaitError::Closed`].
    /// Later registrations resolve the same way.
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        inner.closed = true;
        inner.waiters.clear();
    }
}

/// A one-shot wait registered with [`Matcher::wait_for`].
#[must_use = "a wait does nothing unless awaited"]
pub struct Wait {
    rx: Option<oneshot::Receiver<Message>>,
}

impl Future for Wait {
    type Output = Result<Message, WaitError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.rx.as_mut() {
            Some(rx) => Pin::new(rx).poll(cx).map_err(|_| WaitError::Closed),
            None => Poll::Ready(Err(WaitError::NoPatterns)),
        }
    }
}

/// A repeated wait registered with [`Matcher::subscribe`].
pub struct Subscription {
    rx: Option<mpsc::UnboundedReceiver<Message>>,
}

impl Subscription {
    /// Next matching line, in arrival order.
    pub async fn next(&mut self) -> Result<Message, WaitError> {
        match self.rx.as_mut() {
            Some(rx) => rx.recv().await.ok_or(WaitError::Closed),
            None => Err(WaitError::NoPatterns),
        }
    }
}
