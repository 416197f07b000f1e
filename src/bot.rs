//! Connection supervisor.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{error, info};

use crate::config::{Config, ServerAddr};
use crate::network;

/// Owns the configuration and one connection task per named server.
pub struct Bot {
    config: Arc<Config>,
    servers: HashMap<String, ServerAddr>,
}

impl Bot {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            servers: HashMap::new(),
        }
    }

    /// Register a server under `name`. A second registration under the same
    /// name replaces the first.
    pub fn add_server(&mut self, name: impl Into<String>, addr: ServerAddr) {
        self.servers.insert(name.into(), addr);
    }

    #[cfg(test)]
    pub fn servers(&self) -> impl Iterator<Item = (&str, &ServerAddr)> {
        self.servers.iter().map(|(name, addr)| (name.as_str(), addr))
    }

    /// Connect to every server and keep them connected. Only returns if a
    /// connection task dies unexpectedly.
    pub async fn run(self) -> anyhow::Result<()> {
        if self.servers.is_empty() {
            anyhow::bail!("no servers configured");
        }

        let mut tasks = JoinSet::new();
        for (name, addr) in self.servers {
            info!(server = %name, addr = %addr, "starting connection");
            tasks.spawn(network::run_server(name, addr, Arc::clone(&self.config)));
        }

        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                error!(error = %e, "connection task died");
                return Err(e.into());
            }
        }
        Ok(())
    }
}
