use anyhow::{Context, Result};
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

// ── Top-level config ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to config.toml - computed at load time, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,
    /// Directory holding config.toml, the roster and the state file
    #[serde(skip)]
    pub config_dir: PathBuf,

    /// Tracked-channel roster, relative to the config dir unless absolute.
    #[serde(default = "default_roster_file")]
    pub roster_file: String,

    #[serde(default)]
    pub telegram: TelegramConfig,

    #[serde(default)]
    pub watcher: WatcherConfig,

    #[serde(default)]
    pub listing: ListingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    /// Destination chat for the status message (numeric id or @name).
    #[serde(default)]
    pub chat_id: String,
    /// Bot API base URL; override when pointing at a test double.
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            chat_id: String::new(),
            api_base: default_api_base(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// Seconds between ticks; the first tick fires immediately at startup.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Per-request timeout for channel probing, bounding the worst-case tick.
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
    /// File holding the id of the message being maintained,
    /// relative to the config dir unless absolute.
    #[serde(default = "default_state_file")]
    pub state_file: String,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            probe_timeout_secs: default_probe_timeout_secs(),
            state_file: default_state_file(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingConfig {
    /// Minimum seconds between channel-listing requests per user.
    /// Superusers are exempt; see `cooldown::CooldownTracker`.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: default_cooldown_secs(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: PathBuf::new(),
            config_dir: PathBuf::new(),
            roster_file: default_roster_file(),
            telegram: TelegramConfig::default(),
            watcher: WatcherConfig::default(),
            listing: ListingConfig::default(),
        }
    }
}

fn default_api_base() -> String {
    "https://api.telegram.org".into()
}

fn default_interval_secs() -> u64 {
    300
}

fn default_probe_timeout_secs() -> u64 {
    30
}

fn default_state_file() -> String {
    "message_id".into()
}

fn default_cooldown_secs() -> u64 {
    60
}

fn default_roster_file() -> String {
    "channels.toml".into()
}

impl Config {
    /// Load `~/.onair/config.toml`, writing defaults on first run.
    pub fn load_or_init() -> Result<Self> {
        let home = UserDirs::new()
            .map(|u| u.home_dir().to_path_buf())
            .context("Could not find home directory")?;
        Self::load_or_init_at(home.join(".onair").join("config.toml"))
    }

    /// Load a specific config file, writing defaults if it does not exist.
    pub fn load_or_init_at(config_path: PathBuf) -> Result<Self> {
        let config_dir = config_path
            .parent()
            .map(Path::to_path_buf)
            .context("Config path has no parent directory")?;

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir).with_context(|| {
                format!("Failed to create config directory {}", config_dir.display())
            })?;
        }

        let mut config = if config_path.exists() {
            let contents =
                fs::read_to_string(&config_path).context("Failed to read config file")?;
            let mut config: Config =
                toml::from_str(&contents).context("Failed to parse config file")?;
            config.config_path = config_path;
            config.config_dir = config_dir;
            config
        } else {
            let mut config = Config::default();
            config.config_path = config_path;
            config.config_dir = config_dir;
            config.save()?;
            config
        };

        config.apply_env_overrides();
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&self.config_path, contents)
            .with_context(|| format!("Failed to write {}", self.config_path.display()))?;
        Ok(())
    }

    /// `ONAIR_BOT_TOKEN` takes precedence over the file, so deployments can
    /// keep the token out of the config.
    fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var("ONAIR_BOT_TOKEN") {
            let trimmed = token.trim();
            if !trimmed.is_empty() {
                self.telegram.bot_token = trimmed.to_string();
            }
        }
    }

    pub fn state_file_path(&self) -> PathBuf {
        self.resolve(&self.watcher.state_file)
    }

    pub fn roster_path(&self) -> PathBuf {
        self.resolve(&self.roster_file)
    }

    fn resolve(&self, raw: &str) -> PathBuf {
        let path = PathBuf::from(raw);
        if path.is_absolute() {
            path
        } else {
            self.config_dir.join(path)
        }
    }
}
