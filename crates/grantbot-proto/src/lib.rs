//! # grantbot-proto
//!
//! The IRC protocol subset grantbot speaks: line parsing and serialization,
//! a tokio codec, case mapping, the numerics it reacts to, SASL PLAIN, and
//! a sans-IO registration state machine.
//!
//! ```rust
//! use grantbot_proto::Message;
//!
//! let line: Message = ":srv 318 grantbot alice :End of /WHOIS list.".parse().unwrap();
//! assert_eq!(line.command, grantbot_proto::numeric::RPL_ENDOFWHOIS);
//!
//! let reply = Message::notice("alice", "who are you though");
//! assert_eq!(reply.to_string(), "NOTICE alice :who are you though");
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod casemap;
pub mod codec;
pub mod error;
pub mod hostmask;
pub mod message;
pub mod numeric;
pub mod sasl;
pub mod state;

pub use self::casemap::CaseMapping;
pub use self::codec::{IrcCodec, MAX_IRC_LINE_LEN};
pub use self::error::{MessageParseError, ProtocolError};
pub use self::hostmask::Hostmask;
pub use self::message::Message;
