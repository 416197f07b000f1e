//! Private message commands.
//!
//! Only `grantme [privset]` is understood. Anything else sent to the bot is
//! ignored.

use grantbot_proto::Message;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::SessionError;
use crate::session::Context;
use crate::whois;

/// Why a `grantme` was refused. The message is sent back as a NOTICE.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Denial {
    #[error("who are you though")]
    UnrecognizedIdentity,
    #[error("give me an argument then")]
    MissingArgument,
    #[error("dunno what '{0}' means")]
    UnknownPrivset(String),
}

/// Pick the privset to grant, given the sender's oper name and argument.
pub fn decide<'a>(
    config: &Config,
    oper_name: Option<&str>,
    privset: Option<&'a str>,
) -> Result<&'a str, Denial> {
    if oper_name.is_none() {
        return Err(Denial::UnrecognizedIdentity);
    }
    let privset = privset.ok_or(Denial::MissingArgument)?;
    if !config.allows_privset(privset) {
        return Err(Denial::UnknownPrivset(privset.to_string()));
    }
    Ok(privset)
}

/// Handle one PRIVMSG addressed to the bot.
pub async fn dispatch(ctx: Context, line: Message) -> Result<(), SessionError> {
    let (Some(nick), Some(text)) = (line.source_nickname(), line.param(1)) else {
        return Ok(());
    };
    let text = text.to_lowercase();
    let mut words = text.split_whitespace();

    match words.next() {
        Some("grantme") => grant_me(&ctx, nick, words.next()).await,
        Some(other) => {
            debug!(server = %ctx.server(), nick = %nick, command = %other, "ignoring command");
            Ok(())
        }
        None => Ok(()),
    }
}

async fn grant_me(ctx: &Context, nick: &str, privset: Option<&str>) -> Result<(), SessionError> {
    let oper_name = whois::resolve_oper_name(ctx, nick).await?;

    match decide(ctx.config(), oper_name.as_deref(), privset) {
        Ok(privset) => {
            info!(
                server = %ctx.server(),
                nick = %nick,
                oper = oper_name.as_deref().unwrap_or_default(),
                privset = %privset,
                "granting privset"
            );
            ctx.send(Message::new("GRANT", [nick, privset]))?;
            ctx.notice(nick, format!("good luck with {privset} mate"))
        }
        Err(denial) => {
            info!(server = %ctx.server(), nick = %nick, reason = %denial, "grantme denied");
            ctx.notice(nick, denial.to_string())
        }
    }
}
