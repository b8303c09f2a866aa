//! Configuration types for the banwatch system
//!
//! One [`NotifierConfig`] describes one monitored API. The daemon builds one
//! per configured base URL and hands each to its own notifier task.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::state::{FileWatermarkStore, MemoryWatermarkStore};
use crate::traits::WatermarkStore;

/// Upper bound for the poll interval (one day)
pub const MAX_POLL_INTERVAL_SECS: u64 = 86_400;

/// Configuration of one notifier (one monitored API)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    /// Base URL of the administration API
    pub target: String,

    /// Login credentials for the API
    pub credentials: Credentials,

    /// Seconds between polling cycles
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Login retry policy
    #[serde(default)]
    pub login_retry: LoginRetryConfig,

    /// Only notify a batch once its watermark is durable
    ///
    /// When `true` and the watermark cannot be persisted, the batch is not
    /// announced and the in-memory watermark stays put, so the same bans are
    /// detected again next cycle. When `false`, the batch is announced and the
    /// in-memory watermark advances anyway; a restart before the next
    /// successful save may repeat those notifications.
    #[serde(default = "default_require_durable_watermark")]
    pub require_durable_watermark: bool,

    /// Where the watermark lives
    #[serde(default)]
    pub watermark_store: WatermarkStoreConfig,

    /// Capacity of the notifier event channel
    ///
    /// When full, events are dropped with a warning log.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl NotifierConfig {
    /// Create a configuration with defaults for everything but the target
    pub fn new(target: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            target: target.into(),
            credentials,
            poll_interval_secs: default_poll_interval_secs(),
            login_retry: LoginRetryConfig::default(),
            require_durable_watermark: default_require_durable_watermark(),
            watermark_store: WatermarkStoreConfig::default(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }

    /// Set the poll interval
    pub fn with_poll_interval_secs(mut self, secs: u64) -> Self {
        self.poll_interval_secs = secs;
        self
    }

    /// Set the login retry policy
    pub fn with_login_retry(mut self, login_retry: LoginRetryConfig) -> Self {
        self.login_retry = login_retry;
        self
    }

    /// Set the watermark durability policy
    pub fn with_require_durable_watermark(mut self, required: bool) -> Self {
        self.require_durable_watermark = required;
        self
    }

    /// Set the watermark store
    pub fn with_watermark_store(mut self, store: WatermarkStoreConfig) -> Self {
        self.watermark_store = store;
        self
    }

    /// Time between polling cycles
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        let target = self.target.trim();
        if target.is_empty() {
            return Err(crate::Error::config("API base URL cannot be empty"));
        }
        if !target.starts_with("http://") && !target.starts_with("https://") {
            return Err(crate::Error::config(format!(
                "API base URL must start with http:// or https://, got '{}'",
                target
            )));
        }

        self.credentials.validate()?;

        if !(1..=MAX_POLL_INTERVAL_SECS).contains(&self.poll_interval_secs) {
            return Err(crate::Error::config(format!(
                "Poll interval must be between 1 and {} seconds, got {}",
                MAX_POLL_INTERVAL_SECS, self.poll_interval_secs
            )));
        }

        self.login_retry.validate()?;
        self.watermark_store.validate()?;

        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }

        Ok(())
    }
}

/// API login credentials
///
/// `Debug` never prints the password.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    fn validate(&self) -> Result<(), crate::Error> {
        if self.username.is_empty() {
            return Err(crate::Error::config("API username cannot be empty"));
        }
        if self.password.is_empty() {
            return Err(crate::Error::config("API password cannot be empty"));
        }
        Ok(())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Login retry policy
///
/// After the n-th failed attempt the notifier waits
/// `min(initial_delay * 2^(n-1), max_delay)` before trying again. Once
/// `max_attempts` logins have failed, the notifier halts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRetryConfig {
    /// Total login attempts before giving up
    #[serde(default = "default_login_max_attempts")]
    pub max_attempts: u32,

    /// Delay after the first failure (milliseconds)
    #[serde(default = "default_login_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Cap on the delay between attempts (milliseconds)
    #[serde(default = "default_login_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl LoginRetryConfig {
    /// Delay to wait after `failed_attempts` consecutive failures
    pub fn delay_after(&self, failed_attempts: u32) -> Duration {
        let exponent = failed_attempts.saturating_sub(1).min(32);
        let delay = self
            .initial_delay_ms
            .saturating_mul(1u64 << exponent)
            .min(self.max_delay_ms);
        Duration::from_millis(delay)
    }

    fn validate(&self) -> Result<(), crate::Error> {
        if self.max_attempts == 0 {
            return Err(crate::Error::config("Login max attempts must be > 0"));
        }
        if self.initial_delay_ms == 0 {
            return Err(crate::Error::config("Login retry delay must be > 0"));
        }
        if self.max_delay_ms < self.initial_delay_ms {
            return Err(crate::Error::config(
                "Login retry delay cap must not be below the initial delay",
            ));
        }
        Ok(())
    }
}

impl Default for LoginRetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_login_max_attempts(),
            initial_delay_ms: default_login_initial_delay_ms(),
            max_delay_ms: default_login_max_delay_ms(),
        }
    }
}

/// Watermark store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WatermarkStoreConfig {
    /// Single-line text file
    File {
        /// Path to the watermark file
        path: String,
    },

    /// In-memory store (not persistent)
    Memory,
}

impl WatermarkStoreConfig {
    /// Give this store a location private to one target
    ///
    /// `last_checked.txt` becomes `last_checked-<key>.txt`. Memory stores are
    /// private already and are returned unchanged.
    pub fn for_target(&self, key: &str) -> Self {
        match self {
            WatermarkStoreConfig::File { path } => WatermarkStoreConfig::File {
                path: suffixed_path(path, key),
            },
            WatermarkStoreConfig::Memory => WatermarkStoreConfig::Memory,
        }
    }

    /// Build the configured store
    pub async fn build(&self) -> Result<Box<dyn WatermarkStore>, crate::Error> {
        match self {
            WatermarkStoreConfig::File { path } => {
                Ok(Box::new(FileWatermarkStore::new(path).await?))
            }
            WatermarkStoreConfig::Memory => Ok(Box::new(MemoryWatermarkStore::new())),
        }
    }

    fn validate(&self) -> Result<(), crate::Error> {
        match self {
            WatermarkStoreConfig::File { path } if path.trim().is_empty() => {
                Err(crate::Error::config("Watermark file path cannot be empty"))
            }
            _ => Ok(()),
        }
    }
}

impl Default for WatermarkStoreConfig {
    fn default() -> Self {
        WatermarkStoreConfig::File {
            path: "last_checked.txt".to_string(),
        }
    }
}

/// Storage key for a monitored base URL
///
/// Lowercase, scheme dropped, every run of non-alphanumeric characters
/// collapsed to `-`: `https://Admin.example.com:8010/` becomes
/// `admin-example-com-8010`.
pub fn target_key(base_url: &str) -> String {
    let trimmed = base_url.trim();
    let without_scheme = trimmed
        .split_once("://")
        .map_or(trimmed, |(_, rest)| rest);

    let mut key = String::with_capacity(without_scheme.len());
    for c in without_scheme.chars() {
        if c.is_ascii_alphanumeric() {
            key.push(c.to_ascii_lowercase());
        } else if !key.is_empty() && !key.ends_with('-') {
            key.push('-');
        }
    }

    let key = key.trim_end_matches('-');
    if key.is_empty() {
        "default".to_string()
    } else {
        key.to_string()
    }
}

fn suffixed_path(path: &str, key: &str) -> String {
    let original = Path::new(path);
    let stem = original
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = match original.extension() {
        Some(ext) => format!("{}-{}.{}", stem, key, ext.to_string_lossy()),
        None => format!("{}-{}", stem, key),
    };
    original.with_file_name(file_name).display().to_string()
}

fn default_poll_interval_secs() -> u64 {
    60
}

fn default_require_durable_watermark() -> bool {
    true
}

fn default_event_channel_capacity() -> usize {
    1000
}

fn default_login_max_attempts() -> u32 {
    5
}

fn default_login_initial_delay_ms() -> u64 {
    5_000
}

fn default_login_max_delay_ms() -> u64 {
    300_000
}
