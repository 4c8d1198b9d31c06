//! Network configuration loaded from TOML.

use crate::protocol::CoordinatorConfig;
use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// One party hosted by this process.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct PartyConfig {
    /// Party name, used as its identity.
    name: String,

    /// Whether the party plays automatically.
    #[serde(default)]
    auto_play: bool,
}

impl PartyConfig {
    /// Creates a party entry.
    pub fn new(name: impl Into<String>, auto_play: bool) -> Self {
        Self {
            name: name.into(),
            auto_play,
        }
    }
}

/// Configuration of a local network and its HTTP surface.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Address the HTTP server binds.
    #[serde(default = "default_bind")]
    bind: String,

    /// Milliseconds to wait for a counterparty's endorsement.
    #[serde(default = "default_timeout_ms")]
    endorsement_timeout_ms: u64,

    /// Milliseconds to wait for the notary's decision.
    #[serde(default = "default_timeout_ms")]
    arbitration_timeout_ms: u64,

    /// Name the notary signs as.
    #[serde(default = "default_notary")]
    notary: String,

    /// Parties hosted by this process.
    #[serde(default = "default_parties")]
    parties: Vec<PartyConfig>,
}

#[instrument]
fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

#[instrument]
fn default_timeout_ms() -> u64 {
    30_000
}

#[instrument]
fn default_notary() -> String {
    "Notary".to_string()
}

#[instrument]
fn default_parties() -> Vec<PartyConfig> {
    vec![PartyConfig::new("PartyA", false), PartyConfig::new("PartyB", true)]
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            endorsement_timeout_ms: default_timeout_ms(),
            arbitration_timeout_ms: default_timeout_ms(),
            notary: default_notary(),
            parties: default_parties(),
        }
    }
}

impl NetworkConfig {
    /// Loads configuration from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;
        let config = Self::from_toml(&content)?;
        info!(parties = config.parties.len(), "Config loaded successfully");
        Ok(config)
    }

    /// Parses and validates configuration text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` if it exists, falling back to defaults otherwise.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            warn!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Checks that the network can host a game.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.parties.len() < 2 {
            return Err(ConfigError::new(format!(
                "At least two parties are required, found {}",
                self.parties.len()
            )));
        }
        let mut seen = HashSet::new();
        for party in &self.parties {
            if party.name.trim().is_empty() {
                return Err(ConfigError::new("Party names must not be empty".to_string()));
            }
            if party.name == self.notary {
                return Err(ConfigError::new(format!(
                    "Party {} shares its name with the notary",
                    party.name
                )));
            }
            if !seen.insert(party.name.as_str()) {
                return Err(ConfigError::new(format!("Duplicate party {}", party.name)));
            }
        }
        Ok(())
    }

    /// Replaces the bind port, keeping the host.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        let host = self
            .bind
            .rsplit_once(':')
            .map(|(host, _)| host.to_string())
            .unwrap_or_else(|| self.bind.clone());
        self.bind = format!("{}:{}", host, port);
        self
    }

    /// Coordinator deadlines derived from the millisecond settings.
    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig::default()
            .with_endorsement_timeout(Duration::from_millis(self.endorsement_timeout_ms))
            .with_arbitration_timeout(Duration::from_millis(self.arbitration_timeout_ms))
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = NetworkConfig::from_toml("").unwrap();
        assert_eq!(config, NetworkConfig::default());
        assert_eq!(config.bind(), "127.0.0.1:3000");
        assert_eq!(config.parties().len(), 2);
    }

    #[test]
    fn test_with_port_keeps_host() {
        let config = NetworkConfig::default().with_port(8080);
        assert_eq!(config.bind(), "127.0.0.1:8080");
    }

    #[test]
    fn test_rejects_single_party() {
        let err = NetworkConfig::from_toml(
            r#"
            [[parties]]
            name = "Solo"
            "#,
        )
        .unwrap_err();
        assert!(err.message.contains("two parties"));
    }

    #[test]
    fn test_rejects_party_named_like_notary() {
        let err = NetworkConfig::from_toml(
            r#"
            notary = "Judge"

            [[parties]]
            name = "Judge"

            [[parties]]
            name = "Bob"
            "#,
        )
        .unwrap_err();
        assert!(err.message.contains("notary"));
    }
}
