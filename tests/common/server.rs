//! Scripted IRC server.
//!
//! The tests play the server: they accept the bot's connection and then
//! exchange lines with it by hand.

use grantbot_proto::Message;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::TcpListener;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::timeout;

/// A listening socket the bot is pointed at.
pub struct TestServer {
    listener: TcpListener,
}

impl TestServer {
    /// Bind to an ephemeral localhost port.
    pub async fn bind() -> anyhow::Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
        Ok(Self { listener })
    }

    /// `host:port` for the bot's config.
    pub fn address(&self) -> anyhow::Result<String> {
        Ok(self.listener.local_addr()?.to_string())
    }

    /// Wait for the bot to connect.
    pub async fn accept(&self) -> anyhow::Result<ServerConn> {
        let (stream, _) = timeout(Duration::from_secs(30), self.listener.accept()).await??;
        let (read_half, write_half) = stream.into_split();
        Ok(ServerConn {
            reader: BufReader::new(read_half),
            writer: BufWriter::new(write_half),
        })
    }
}

/// The server side of one bot connection.
pub struct ServerConn {
    reader: BufReader<OwnedReadHalf>,
    writer: BufWriter<OwnedWriteHalf>,
}

impl ServerConn {
    /// Send a raw IRC line.
    pub async fn send_raw(&mut self, line: &str) -> anyhow::Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        if !line.ends_with("\r\n") {
            self.writer.write_all(b"\r\n").await?;
        }
        self.writer.flush().await?;
        Ok(())
    }

    /// Receive a single line from the bot.
    pub async fn recv(&mut self) -> anyhow::Result<Message> {
        self.recv_timeout(Duration::from_secs(5)).await
    }

    /// Receive a line with a timeout.
    pub async fn recv_timeout(&mut self, dur: Duration) -> anyhow::Result<Message> {
        let mut line = String::new();
        let read = timeout(dur, self.reader.read_line(&mut line)).await??;
        if read == 0 {
            anyhow::bail!("bot closed the connection");
        }
        line.trim_end()
            .parse::<Message>()
            .map_err(|e| anyhow::anyhow!("Parse error: {}", e))
    }

    /// Receive a line and check it equals `expected`.
    pub async fn expect(&mut self, expected: &str) -> anyhow::Result<()> {
        let received = self.recv().await?;
        let expected: Message = expected.parse()?;
        anyhow::ensure!(
            received == expected,
            "expected `{}`, got `{}`",
            expected,
            received
        );
        Ok(())
    }

    /// Assert the bot stays quiet for a short while.
    pub async fn expect_silence(&mut self) -> anyhow::Result<()> {
        match self.recv_timeout(Duration::from_millis(300)).await {
            Ok(message) => anyhow::bail!("expected silence, got `{}`", message),
            Err(_) => Ok(()),
        }
    }

    /// Walk the bot through registration without SASL, answering the
    /// welcome with `nick`.
    #[allow(dead_code)]
    pub async fn register_plain(&mut self, nick: &str) -> anyhow::Result<()> {
        self.expect("PASS connpass").await?;
        self.expect("CAP LS 302").await?;
        self.expect("NICK grantbot").await?;
        self.expect("USER grantbot 0 * grantbot").await?;
        self.send_raw(":irc.test CAP * LS :multi-prefix").await?;
        self.expect("CAP END").await?;
        self.send_raw(&format!(":irc.test 001 {nick} :Welcome to the test network"))
            .await
    }

    /// Answer the WHOIS the bot sends for `nick`, optionally with an oper
    /// line.
    pub async fn answer_whois(&mut self, nick: &str, oper: Option<&str>) -> anyhow::Result<()> {
        self.expect(&format!("WHOIS {nick}")).await?;
        self.send_raw(&format!(
            ":irc.test 311 grantbot {nick} {nick} host.test * :{nick}"
        ))
        .await?;
        if let Some(oper) = oper {
            self.send_raw(&format!(
                ":irc.test 320 grantbot {nick} :is opered as {oper}, privset admin"
            ))
            .await?;
        }
        self.send_raw(&format!(
            ":irc.test 318 grantbot {nick} :End of /WHOIS list."
        ))
        .await
    }
}
