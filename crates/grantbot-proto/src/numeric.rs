//! Numeric replies this crate and the bot care about.
//!
//! Command tokens are kept as strings, so numerics are `&str` constants that
//! compare directly against [`Message::command`](crate::Message::command).

/// Registration succeeded; first parameter is our nickname.
pub const RPL_WELCOME: &str = "001";
/// ISUPPORT tokens (`CASEMAPPING=...`).
pub const RPL_ISUPPORT: &str = "005";
/// End of a WHOIS reply burst.
pub const RPL_ENDOFWHOIS: &str = "318";
/// Free-form WHOIS line; carries `is opered as <name>, privset <set>`.
pub const RPL_WHOISSPECIAL: &str = "320";
/// OPER succeeded.
pub const RPL_YOUREOPER: &str = "381";
/// Unknown command (servers without CAP answer `CAP LS` with this).
pub const ERR_UNKNOWNCOMMAND: &str = "421";
/// Nickname rejected as invalid.
pub const ERR_ERRONEUSNICKNAME: &str = "432";
/// Nickname already taken.
pub const ERR_NICKNAMEINUSE: &str = "433";
/// One fragment of an RSA CHALLENGE.
pub const RPL_RSACHALLENGE2: &str = "740";
/// End of an RSA CHALLENGE.
pub const RPL_ENDOFRSACHALLENGE2: &str = "741";
/// SASL: logged in as an account.
pub const RPL_LOGGEDIN: &str = "900";
/// SASL: account is locked.
pub const ERR_NICKLOCKED: &str = "902";
/// SASL: authentication succeeded.
pub const RPL_SASLSUCCESS: &str = "903";
/// SASL: authentication failed.
pub const ERR_SASLFAIL: &str = "904";
/// SASL: message too long.
pub const ERR_SASLTOOLONG: &str = "905";
/// SASL: aborted.
pub const ERR_SASLABORTED: &str = "906";
/// SASL: already authenticated.
pub const ERR_SASLALREADY: &str = "907";

/// Whether `command` is one of the SASL failure numerics.
pub fn is_sasl_failure(command: &str) -> bool {
    matches!(
        command,
        ERR_NICKLOCKED | ERR_SASLFAIL | ERR_SASLTOOLONG | ERR_SASLABORTED | ERR_SASLALREADY
    )
}
