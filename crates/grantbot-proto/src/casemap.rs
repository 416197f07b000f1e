//! IRC case mapping.
//!
//! Servers advertise how nicknames and channel names compare through the
//! `CASEMAPPING` ISUPPORT token. Three mappings are in common use:
//!
//! - `ascii`: only `A-Z` fold to `a-z`.
//! - `rfc1459`: additionally `[]\~` fold to `{}|^`. This is the default when
//!   the server does not say otherwise.
//! - `strict-rfc1459`: like `rfc1459` but `~` and `^` are distinct.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// A server case mapping.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CaseMapping {
    /// `ascii`
    Ascii,
    /// `rfc1459`
    #[default]
    Rfc1459,
    /// `strict-rfc1459`
    StrictRfc1459,
}

impl CaseMapping {
    /// Fold a single character.
    #[inline]
    pub const fn fold_char(self, c: char) -> char {
        match (self, c) {
            (_, 'A'..='Z') => (c as u8 + 32) as char,
            (Self::Ascii, _) => c,
            (_, '[') => '{',
            (_, ']') => '}',
            (_, '\\') => '|',
            (Self::Rfc1459, '~') => '^',
            _ => c,
        }
    }

    /// Fold a string.
    pub fn fold(self, s: &str) -> String {
        s.chars().map(|c| self.fold_char(c)).collect()
    }

    /// Compare two strings under this mapping without allocating.
    pub fn equals(self, a: &str, b: &str) -> bool {
        a.len() == b.len()
            && a.chars()
                .zip(b.chars())
                .all(|(ca, cb)| self.fold_char(ca) == self.fold_char(cb))
    }

    /// The ISUPPORT token value for this mapping.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ascii => "ascii",
            Self::Rfc1459 => "rfc1459",
            Self::StrictRfc1459 => "strict-rfc1459",
        }
    }
}

impl fmt::Display for CaseMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned for `CASEMAPPING` values this crate does not know.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown case mapping: {0}")]
pub struct UnknownCaseMapping(pub String);

impl FromStr for CaseMapping {
    type Err = UnknownCaseMapping;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ascii" => Ok(Self::Ascii),
            "rfc1459" => Ok(Self::Rfc1459),
            "strict-rfc1459" => Ok(Self::StrictRfc1459),
            _ => Err(UnknownCaseMapping(s.to_string())),
        }
    }
}
