//! The CHALLENGE exchange after `CHALLENGE <name>` has gone out.

use grantbot_proto::Message;
use grantbot_proto::numeric::RPL_ENDOFRSACHALLENGE2;
use tracing::{debug, info};

use super::Context;
use crate::challenge::Challenge;
use crate::error::SessionError;
use crate::matcher::Subscription;

/// Collect 740 fragments until 741, then answer with the response token.
///
/// `replies` must already be subscribed to 740 and 741 for the bot's nick.
pub(super) async fn authenticate(
    ctx: Context,
    mut challenge: Challenge,
    mut replies: Subscription,
) -> Result<(), SessionError> {
    let mut fragments = 0usize;
    loop {
        let line = replies.next().await?;
        if line.is(RPL_ENDOFRSACHALLENGE2) {
            break;
        }
        if let Some(fragment) = line.param(1) {
            challenge.push(fragment);
            fragments += 1;
        }
    }
    drop(replies);

    debug!(server = %ctx.server(), fragments, "challenge complete");
    let response = challenge.finalize()?;
    ctx.send(Message::new("CHALLENGE", [format!("+{response}")]))?;
    info!(server = %ctx.server(), "sent CHALLENGE response");
    Ok(())
}
