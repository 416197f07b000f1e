//! Operator identity lookup via WHOIS.
//!
//! Servers that support GRANT report oper status as a 320 line:
//!
//! ```text
//! :srv 320 grantbot alice :is opered as alice, privset admin
//! :srv 318 grantbot alice :End of /WHOIS list.
//! ```

use std::sync::LazyLock;

use grantbot_proto::Message;
use grantbot_proto::numeric::{RPL_ENDOFWHOIS, RPL_WHOISSPECIAL};
use regex::Regex;
use tracing::debug;

use crate::error::SessionError;
use crate::matcher::LinePattern;
use crate::session::Context;

// Names with ',' or '<' never match, so they can't spoof the grant-receiver
// display.
static OPER_TRAILER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^is opered as ([^,<]+), privset (\S+)$").expect("oper trailer regex")
});

/// Extract the oper name from a 320 trailer.
pub fn parse_oper_name(trailer: &str) -> Option<&str> {
    OPER_TRAILER
        .captures(trailer)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// WHOIS `nickname` and return the oper name it is logged in as, if any.
///
/// Only the first 320 line is considered. Suspends until the server sends
/// the end of the WHOIS reply.
pub async fn resolve_oper_name(
    ctx: &Context,
    nickname: &str,
) -> Result<Option<String>, SessionError> {
    let mut replies = ctx.matcher().subscribe(vec![
        LinePattern::new(RPL_WHOISSPECIAL).self_nick().folded(nickname),
        LinePattern::new(RPL_ENDOFWHOIS).self_nick().folded(nickname),
    ]);
    ctx.send(Message::new("WHOIS", [nickname]))?;

    let mut special: Option<Message> = None;
    loop {
        let line = replies.next().await?;
        if line.is(RPL_ENDOFWHOIS) {
            break;
        }
        special.get_or_insert(line);
    }

    let oper_name = special
        .as_ref()
        .and_then(|line| line.param(2))
        .and_then(parse_oper_name)
        .map(str::to_string);
    debug!(server = %ctx.server(), nick = %nickname, oper = ?oper_name, "whois resolved");
    Ok(oper_name)
}
