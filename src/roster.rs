use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Identity of a tracked channel. Snapshotted once per tick; this side never
/// mutates it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChannelDescriptor {
    /// Canonical channel URL, e.g. `https://www.youtube.com/@somebody`.
    pub url: String,
    pub label: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Telegram user id of whoever registered the channel.
    #[serde(default)]
    pub owner: Option<i64>,
}

fn default_enabled() -> bool {
    true
}

/// Source of the current tracked-channel snapshot.
#[async_trait]
pub trait ChannelRepository: Send + Sync {
    /// The enabled channels, in registration order.
    async fn enabled_channels(&self) -> Result<Vec<ChannelDescriptor>>;
}

#[derive(Debug, Deserialize, Default)]
struct RosterFile {
    #[serde(default)]
    channels: Vec<ChannelDescriptor>,
}

/// Roster backed by a `channels.toml` next to the config. Re-read on every
/// call so edits take effect on the next tick without a restart.
pub struct TomlRoster {
    path: PathBuf,
}

impl TomlRoster {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ChannelRepository for TomlRoster {
    async fn enabled_channels(&self) -> Result<Vec<ChannelDescriptor>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read roster {}", self.path.display()))?;
        let parsed: RosterFile = toml::from_str(&raw)
            .with_context(|| format!("Invalid roster {}", self.path.display()))?;
        Ok(parsed
            .channels
            .into_iter()
            .filter(|c| c.enabled)
            .collect())
    }
}
