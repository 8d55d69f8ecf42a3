//! Client configuration

use serde::{Deserialize, Serialize};
use std::path::Path;

use hwlink_core::Network;

/// Configuration of a device client
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Network to derive keys and sign for
    pub network: Network,

    /// Whether the client runs without an interactive terminal
    ///
    /// A headless host (e.g. a wallet GUI driving the client) cannot ask
    /// the user to run another command, so error wording differs.
    pub headless: bool,
}

impl ClientConfig {
    pub fn new(network: Network) -> Self {
        Self {
            network,
            ..Self::default()
        }
    }

    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Load configuration from file
    pub fn load(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// What the user should do to unlock a locked device
    pub fn unlock_hint(&self) -> &'static str {
        if self.headless {
            "Please load wallet to unlock."
        } else {
            "Please use any subcommand to unlock"
        }
    }
}
