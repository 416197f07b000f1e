//! Test bot management.
//!
//! Spawns the grantbot binary against a [`TestServer`](super::TestServer).

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use tempfile::TempDir;

/// Operator key shipped with the tests; its password is `hunter2`.
pub fn fixture_key() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/oper.key")
}

/// A running bot process.
pub struct TestBot {
    child: Child,
    _dir: TempDir,
}

impl TestBot {
    /// Spawn the bot pointed at `server` (`host:port`), using `key` for
    /// CHALLENGE.
    pub fn spawn(server: &str, key: &Path) -> anyhow::Result<Self> {
        let dir = tempfile::tempdir()?;
        let config_path = dir.path().join("grantbot.yaml");
        let config_content = format!(
            r#"
nickname: grantbot
server: "{}"
password: connpass
sasl:
  username: grantbot
  password: saslpass
oper:
  name: grantbot
  file: "{}"
  pass: hunter2
privsets:
  - oper
  - helper
"#,
            server,
            key.display()
        );
        std::fs::write(&config_path, config_content)?;

        let child = Command::new(env!("CARGO_BIN_EXE_grantbot"))
            .arg(&config_path)
            .env("RUST_LOG", "grantbot=debug")
            .stdout(Stdio::null())
            .spawn()?;

        Ok(Self { child, _dir: dir })
    }
}

impl Drop for TestBot {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
