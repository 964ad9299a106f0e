//! Configuration file management.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use nightscout_core::{ClientOptions, RetryConfig};
use nightscout_types::GlucoseUnit;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Directory name under the platform config dir.
pub const CONFIG_DIR_NAME: &str = "nightscout-menubar";

/// Shortest poll interval accepted from the config file.
const MIN_POLL_INTERVAL_SECS: u64 = 5;

/// Configuration file structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Nightscout site URL, empty until the user sets one
    #[serde(default)]
    pub nightscout_host: String,

    /// Show values in mmol/L instead of mg/dL
    #[serde(default)]
    pub use_mmol: bool,

    /// Seconds between polls
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Skip TLS certificate verification (self-signed hosts)
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

fn default_poll_interval() -> u64 {
    20
}

fn default_request_timeout() -> u64 {
    2
}

impl Default for Config {
    fn default() -> Self {
        Self {
            nightscout_host: String::new(),
            use_mmol: false,
            poll_interval_secs: default_poll_interval(),
            request_timeout_secs: default_request_timeout(),
            accept_invalid_certs: false,
        }
    }
}

impl Config {
    /// Get the config file path
    pub fn path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_DIR_NAME)
            .join("config.toml")
    }

    /// Load config from `path`, or return default if missing or unreadable
    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        warn!("Failed to parse config {}: {}", path.display(), e);
                    }
                },
                Err(e) => {
                    warn!("Failed to read config {}: {}", path.display(), e);
                }
            }
        }
        Self::default()
    }

    /// Save config to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// Whether a Nightscout host has been set.
    pub fn has_host(&self) -> bool {
        !self.nightscout_host.is_empty()
    }

    /// Display unit derived from `use_mmol`.
    pub fn unit(&self) -> GlucoseUnit {
        GlucoseUnit::from_mmol_flag(self.use_mmol)
    }

    /// Time between polls, never below a few seconds.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(MIN_POLL_INTERVAL_SECS))
    }

    /// HTTP client options for this config.
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            timeout: Duration::from_secs(self.request_timeout_secs.max(1)),
            accept_invalid_certs: self.accept_invalid_certs,
            retry: RetryConfig::for_poll(),
        }
    }
}

/// Normalize a host typed by the user: trim whitespace and trailing slashes.
pub fn normalize_host(host: &str) -> String {
    host.trim().trim_end_matches('/').to_string()
}

/// A config bound to its file; every setter writes through.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    config: Config,
}

impl ConfigStore {
    /// Open the store at the default path.
    pub fn open_default() -> Self {
        Self::open(Config::path())
    }

    /// Open the store at `path`, writing defaults if the file is missing.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let config = Config::load_from(&path);
        if !path.exists() {
            match config.save_to(&path) {
                Ok(()) => debug!("Wrote default config to {}", path.display()),
                Err(e) => warn!("Could not write default config: {:#}", e),
            }
        }
        Self { path, config }
    }

    /// The current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Set and persist the Nightscout host.
    pub fn set_host(&mut self, host: &str) -> Result<()> {
        self.update(|config| config.nightscout_host = normalize_host(host))
    }

    /// Set and persist the unit preference.
    pub fn set_use_mmol(&mut self, use_mmol: bool) -> Result<()> {
        self.update(|config| config.use_mmol = use_mmol)
    }

    /// Set and persist the display unit.
    pub fn set_unit(&mut self, unit: GlucoseUnit) -> Result<()> {
        self.set_use_mmol(unit.is_mmol())
    }

    /// Apply `change` to a copy and keep it only once it is on disk.
    fn update(&mut self, change: impl FnOnce(&mut Config)) -> Result<()> {
        let mut config = self.config.clone();
        change(&mut config);
        config.save_to(&self.path)?;
        self.config = config;
        Ok(())
    }
}
