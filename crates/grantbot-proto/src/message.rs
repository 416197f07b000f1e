//! Parsed IRC lines.
//!
//! A [`Message`] is the immutable unit every other component works with:
//!
//! ```text
//! [@tags] [:source] <command> [params...] [:trailing]
//! ```
//!
//! Tags are kept as the raw string after `@`; the bot never requests a
//! capability that makes the server send them, but a line carrying them
//! still parses.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use nom::{
    bytes::complete::{take_till1, take_while1},
    character::complete::{char, space0},
    combinator::{opt, verify},
    sequence::preceded,
    IResult,
};

use crate::error::MessageParseError;
use crate::hostmask::Hostmask;

/// An owned, parsed IRC line.
///
/// # Example
///
/// ```
/// use grantbot_proto::Message;
///
/// let msg: Message = ":alice!a@host PRIVMSG bot :grantme oper".parse().unwrap();
/// assert_eq!(msg.command, "PRIVMSG");
/// assert_eq!(msg.param(1), Some("grantme oper"));
/// assert_eq!(msg.source_nickname(), Some("alice"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    /// Raw IRCv3 tag string (without the leading `@`).
    pub tags: Option<String>,
    /// Source hostmask.
    pub source: Option<Hostmask>,
    /// Command token: a verb (`PRIVMSG`) or a three digit numeric (`001`).
    pub command: String,
    /// Parameters, trailing parameter included as the last element.
    pub params: Vec<String>,
}

impl Message {
    /// Build an outgoing message with no source.
    pub fn new<I, S>(command: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: None,
            source: None,
            command: command.into(),
            params: params.into_iter().map(Into::into).collect(),
        }
    }

    /// `NOTICE <target> :<text>`
    pub fn notice(target: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new("NOTICE", [target.into(), text.into()])
    }

    /// `PRIVMSG <target> :<text>`
    pub fn privmsg(target: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new("PRIVMSG", [target.into(), text.into()])
    }

    /// Attach a source.
    #[must_use]
    pub fn with_source(mut self, source: Hostmask) -> Self {
        self.source = Some(source);
        self
    }

    /// Parse one line. A trailing CR/LF is ignored.
    pub fn parse(line: &str) -> Result<Self, MessageParseError> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return Err(MessageParseError::EmptyMessage);
        }

        let (rest, (tags, source, command)) = match parse_head(line) {
            Ok(parsed) => parsed,
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
                if line.trim_start().starts_with(':') && e.input.starts_with(':') {
                    return Err(MessageParseError::InvalidPrefix(line.to_string()));
                }
                return Err(MessageParseError::InvalidCommand {
                    line: line.to_string(),
                    position: line.len() - e.input.len(),
                });
            }
            Err(nom::Err::Incomplete(_)) => {
                return Err(MessageParseError::InvalidCommand {
                    line: line.to_string(),
                    position: line.len(),
                });
            }
        };

        Ok(Self {
            tags: tags.map(str::to_string),
            source: source.map(Hostmask::parse),
            command: command.to_string(),
            params: parse_params(rest),
        })
    }

    /// Parameter at `index`, if present.
    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }

    /// Whether the command token is `command`. Verbs compare ASCII
    /// case-insensitively; numerics are digits so this is exact for them.
    pub fn is(&self, command: &str) -> bool {
        self.command.eq_ignore_ascii_case(command)
    }

    /// Whether the command is a three digit numeric reply.
    pub fn is_numeric(&self) -> bool {
        self.command.len() == 3 && self.command.bytes().all(|b| b.is_ascii_digit())
    }

    /// Nickname of the sender, if the line has a source.
    pub fn source_nickname(&self) -> Option<&str> {
        self.source
            .as_ref()
            .map(|s| s.nickname.as_str())
            .filter(|nick| !nick.is_empty())
    }
}

impl FromStr for Message {
    type Err = MessageParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Serializes without the trailing CR/LF; the codec adds it.
impl Display for Message {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(ref tags) = self.tags {
            write!(f, "@{} ", tags)?;
        }
        if let Some(ref source) = self.source {
            write!(f, ":{} ", source)?;
        }
        f.write_str(&self.command)?;

        let last = self.params.len().saturating_sub(1);
        for (i, param) in self.params.iter().enumerate() {
            if i == last && needs_trailing(param) {
                write!(f, " :{}", param)?;
            } else {
                write!(f, " {}", param)?;
            }
        }
        Ok(())
    }
}

fn needs_trailing(param: &str) -> bool {
    param.is_empty() || param.contains(' ') || param.starts_with(':')
}

fn parse_tags(input: &str) -> IResult<&str, &str> {
    preceded(char('@'), take_till1(|c| c == ' '))(input)
}

fn parse_source(input: &str) -> IResult<&str, &str> {
    preceded(char(':'), take_till1(|c| c == ' '))(input)
}

/// `1*letter / 3digit` (RFC 2812).
fn parse_command(input: &str) -> IResult<&str, &str> {
    verify(take_while1(|c: char| c.is_ascii_alphanumeric()), |cmd: &str| {
        cmd.chars().all(|c| c.is_ascii_alphabetic())
            || (cmd.len() == 3 && cmd.chars().all(|c| c.is_ascii_digit()))
    })(input)
}

fn parse_head(input: &str) -> IResult<&str, (Option<&str>, Option<&str>, &str)> {
    let (input, tags) = opt(parse_tags)(input)?;
    let (input, _) = space0(input)?;
    let (input, source) = opt(parse_source)(input)?;
    let (input, _) = space0(input)?;
    let (input, command) = parse_command(input)?;
    Ok((input, (tags, source, command)))
}

/// Split what follows the command into parameters. Runs of spaces count as
/// one separator; a `:` starts the trailing parameter, which may be empty.
fn parse_params(input: &str) -> Vec<String> {
    let mut params = Vec::new();
    let mut rest = input;

    loop {
        let trimmed = rest.trim_start_matches(' ');
        if trimmed.len() == rest.len() || trimmed.is_empty() {
            // Parameters must be space separated; anything glued to the
            // command (or nothing at all) ends the list.
            break;
        }
        if let Some(trailing) = trimmed.strip_prefix(':') {
            params.push(trailing.to_string());
            break;
        }
        let end = trimmed.find(' ').unwrap_or(trimmed.len());
        params.push(trimmed[..end].to_string());
        rest = &trimmed[end..];
    }

    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_numeric_with_trailing() {
        let msg = Message::parse(
            ":niven.freenode.net 320 sandcat sandcat :is opered as jess, privset sandcat\r\n",
        )
        .unwrap();
        assert_eq!(msg.command, "320");
        assert!(msg.is_numeric());
        assert_eq!(
            msg.params,
            vec!["sandcat", "sandcat", "is opered as jess, privset sandcat"]
        );
        assert_eq!(
            msg.source.as_ref().map(|s| s.nickname.as_str()),
            Some("niven.freenode.net")
        );
    }

    #[test]
    fn test_parse_no_source() {
        let msg = Message::parse("PING :irc.example.net").unwrap();
        assert!(msg.is("ping"));
        assert!(msg.source.is_none());
        assert_eq!(msg.params, vec!["irc.example.net"]);
    }

    #[test]
    fn test_parse_tags() {
        let msg = Message::parse("@time=2023-01-01T00:00:00Z :a!b@c PRIVMSG bot :hi").unwrap();
        assert_eq!(msg.tags.as_deref(), Some("time=2023-01-01T00:00:00Z"));
        assert_eq!(msg.source_nickname(), Some("a"));
    }

    #[test]
    fn test_parse_empty_trailing() {
        let msg = Message::parse(":srv CAP * LS :").unwrap();
        assert_eq!(msg.params, vec!["*", "LS", ""]);
    }

    #[test]
    fn test_parse_collapses_spaces() {
        let msg = Message::parse("NICK   bot  ").unwrap();
        assert_eq!(msg.params, vec!["bot"]);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(Message::parse("\r\n"), Err(MessageParseError::EmptyMessage));
        assert!(matches!(
            Message::parse("12 foo"),
            Err(MessageParseError::InvalidCommand { .. })
        ));
        assert!(matches!(
            Message::parse(": PRIVMSG x"),
            Err(MessageParseError::InvalidPrefix(_))
        ));
    }

    #[test]
    fn test_serialize_trailing_rules() {
        assert_eq!(
            Message::notice("alice", "good luck with oper mate").to_string(),
            "NOTICE alice :good luck with oper mate"
        );
        assert_eq!(
            Message::new("GRANT", ["alice", "oper"]).to_string(),
            "GRANT alice oper"
        );
        assert_eq!(
            Message::new("CHALLENGE", ["+abc="]).to_string(),
            "CHALLENGE +abc="
        );
        assert_eq!(Message::new("USER", ["bot", "0", "*", ""]).to_string(), "USER bot 0 * :");
        assert_eq!(Message::new("QUIT", Vec::<String>::new()).to_string(), "QUIT");
    }

    #[test]
    fn test_serialize_with_source() {
        let msg = Message::privmsg("bot", "grantme oper")
            .with_source(Hostmask::new("alice", "a", "host"));
        assert_eq!(msg.to_string(), ":alice!a@host PRIVMSG bot :grantme oper");
    }

    proptest! {
        #[test]
        fn prop_trailing_text_survives(text in "[ -~]{0,80}") {
            let msg = Message::privmsg("bot", text.clone());
            let parsed = Message::parse(&msg.to_string()).unwrap();
            prop_assert_eq!(parsed.param(1), Some(text.as_str()));
        }
    }
}
