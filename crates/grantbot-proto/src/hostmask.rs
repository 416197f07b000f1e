//! Message source (`nick!user@host`).

use std::fmt;

/// The source of a message.
///
/// Server-originated lines carry just a server name, which lands in
/// `nickname` with no user or host part; callers that care can check
/// [`Hostmask::is_server`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Hostmask {
    /// Nickname, or server name for server-originated lines.
    pub nickname: String,
    /// Username (ident), if present.
    pub username: Option<String>,
    /// Hostname, if present.
    pub hostname: Option<String>,
}

impl Hostmask {
    /// Build a full `nick!user@host` mask.
    pub fn new(
        nickname: impl Into<String>,
        username: impl Into<String>,
        hostname: impl Into<String>,
    ) -> Self {
        Self {
            nickname: nickname.into(),
            username: Some(username.into()),
            hostname: Some(hostname.into()),
        }
    }

    /// Parse a source string. Lenient: components are not validated.
    pub fn parse(s: &str) -> Self {
        let (rest, hostname) = match s.split_once('@') {
            Some((rest, host)) => (rest, Some(host.to_string())),
            None => (s, None),
        };
        let (nickname, username) = match rest.split_once('!') {
            Some((nick, user)) => (nick, Some(user.to_string())),
            None => (rest, None),
        };

        Self {
            nickname: nickname.to_string(),
            username,
            hostname,
        }
    }

    /// Heuristic: a bare name containing a dot is a server.
    pub fn is_server(&self) -> bool {
        self.username.is_none() && self.hostname.is_none() && self.nickname.contains('.')
    }
}

impl fmt::Display for Hostmask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.nickname)?;
        if let Some(ref user) = self.username {
            write!(f, "!{}", user)?;
        }
        if let Some(ref host) = self.hostname {
            write!(f, "@{}", host)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full() {
        let mask = Hostmask::parse("alice!a@example.org");
        assert_eq!(mask, Hostmask::new("alice", "a", "example.org"));
        assert!(!mask.is_server());
    }

    #[test]
    fn test_parse_server() {
        let mask = Hostmask::parse("niven.freenode.net");
        assert_eq!(mask.nickname, "niven.freenode.net");
        assert!(mask.username.is_none());
        assert!(mask.is_server());
    }

    #[test]
    fn test_parse_nick_host() {
        let mask = Hostmask::parse("bob@host");
        assert_eq!(mask.nickname, "bob");
        assert_eq!(mask.username, None);
        assert_eq!(mask.hostname.as_deref(), Some("host"));
    }

    #[test]
    fn test_display_roundtrip() {
        for raw in ["alice!a@example.org", "irc.example.net", "bob@host"] {
            assert_eq!(Hostmask::parse(raw).to_string(), raw);
        }
    }
}
