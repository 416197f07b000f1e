//! Configuration loading.
//!
//! The bot reads one YAML file at startup:
//!
//! ```yaml
//! nickname: grantbot
//! server: irc.example.net:+6697   # leading + means TLS
//! password: connection-password
//! sasl:
//!   username: grantbot
//!   password: account-password
//! oper:
//!   name: grantbot
//!   file: ~/.config/grantbot/oper.key
//!   pass: key-password
//! privsets: [oper, helper]
//! ```
//!
//! `username` and `realname` are optional and default to the nickname.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use grantbot_proto::state::{HandshakeConfig, SaslCredentials};
use serde::Deserialize;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("server must be host:port or host:+port, got '{0}'")]
    InvalidServer(String),
    #[error("invalid port '{0}'")]
    InvalidPort(String),
}

/// The file as written.
#[derive(Debug, Deserialize)]
struct RawConfig {
    nickname: String,
    username: Option<String>,
    realname: Option<String>,
    password: String,
    sasl: SaslConfig,
    oper: RawOper,
    server: String,
    privsets: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawOper {
    name: String,
    file: String,
    pass: String,
}

/// SASL PLAIN account credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct SaslConfig {
    pub username: String,
    pub password: String,
}

/// Operator credentials for CHALLENGE.
#[derive(Debug, Clone)]
pub struct OperConfig {
    /// Oper block name sent with `CHALLENGE <name>`.
    pub name: String,
    /// Private key file, `~` already expanded.
    pub file: PathBuf,
    /// Password the key file is encrypted with.
    pub pass: String,
}

/// Where to connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddr {
    pub host: String,
    pub port: u16,
    pub tls: bool,
}

impl FromStr for ServerAddr {
    type Err = ConfigError;

    /// `host:port`, or `host:+port` for TLS. IPv6 hosts go in brackets.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| ConfigError::InvalidServer(s.to_string()))?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return Err(ConfigError::InvalidServer(s.to_string()));
        }

        let (tls, port) = match port.strip_prefix('+') {
            Some(port) => (true, port),
            None => (false, port),
        };
        let port = port
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort(port.to_string()))?;

        Ok(Self {
            host: host.to_string(),
            port,
            tls,
        })
    }
}

impl fmt::Display for ServerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plus = if self.tls { "+" } else { "" };
        if self.host.contains(':') {
            write!(f, "[{}]:{}{}", self.host, plus, self.port)
        } else {
            write!(f, "{}:{}{}", self.host, plus, self.port)
        }
    }
}

/// Bot configuration. Immutable once loaded; shared as `Arc<Config>`.
#[derive(Debug, Clone)]
pub struct Config {
    pub nickname: String,
    pub username: String,
    pub realname: String,
    /// Connection password (`PASS`).
    pub password: String,
    pub sasl: SaslConfig,
    pub oper: OperConfig,
    pub server: ServerAddr,
    /// Privsets `grantme` may hand out.
    pub privsets: Vec<String>,
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_yaml::from_str(content)?;
        let server = raw.server.parse()?;

        Ok(Self {
            username: raw.username.unwrap_or_else(|| raw.nickname.clone()),
            realname: raw.realname.unwrap_or_else(|| raw.nickname.clone()),
            nickname: raw.nickname,
            password: raw.password,
            sasl: raw.sasl,
            oper: OperConfig {
                name: raw.oper.name,
                file: expand_home(&raw.oper.file),
                pass: raw.oper.pass,
            },
            server,
            privsets: raw.privsets,
        })
    }

    /// Whether `grantme <name>` may hand out `name`.
    pub fn allows_privset(&self, name: &str) -> bool {
        self.privsets.iter().any(|p| p == name)
    }

    /// Registration parameters for a new connection.
    pub fn handshake(&self) -> HandshakeConfig {
        HandshakeConfig {
            nickname: self.nickname.clone(),
            username: self.username.clone(),
            realname: self.realname.clone(),
            password: Some(self.password.clone()).filter(|p| !p.is_empty()),
            sasl_credentials: (!self.sasl.username.is_empty()).then(|| SaslCredentials {
                account: self.sasl.username.clone(),
                password: self.sasl.password.clone(),
            }),
        }
    }
}

#[cfg(test)]
impl Config {
    /// A complete config pointing at `key_file`, with privsets `oper` and
    /// `helper`.
    pub(crate) fn for_tests(key_file: &Path) -> std::sync::Arc<Self> {
        let mut config = Self::from_yaml(tests::SAMPLE).unwrap();
        config.oper.pass = "hunter2".to_string();
        config.oper.file = key_file.to_path_buf();
        std::sync::Arc::new(config)
    }
}

/// Expand a leading `~` or `~/` to `$HOME`.
fn expand_home(path: &str) -> PathBuf {
    let rest = match path.strip_prefix('~') {
        Some("") => "",
        Some(rest) if rest.starts_with('/') => &rest[1..],
        _ => return PathBuf::from(path),
    };
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(rest),
        None => PathBuf::from(path),
    }
}
