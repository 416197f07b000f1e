//! grantbot - opers up with CHALLENGE and hands out privsets on request.

mod bot;
mod challenge;
mod commands;
mod config;
mod error;
mod matcher;
mod network;
mod session;
mod whois;

use crate::bot::Bot;
use crate::config::Config;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "grantbot.yaml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    info!(
        nick = %config.nickname,
        server = %config.server,
        privsets = ?config.privsets,
        "Starting grantbot"
    );

    let name = config.server.host.clone();
    let addr = config.server.clone();
    let mut bot = Bot::new(config);
    bot.add_server(name, addr);

    bot.run().await
}
