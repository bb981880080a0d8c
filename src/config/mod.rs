//! Configuration management for homily
//!
//! This module handles loading and validating configuration from a TOML file
//! and `HOMILY_*` environment variables. Every section has defaults, so an
//! empty file (or no file at all) yields a usable configuration.
//!
//! Precedence, lowest first: built-in defaults, TOML file, environment.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::Error;
use crate::scheduler::rotation::{RotationMode, DEFAULT_RECENT_WINDOW};

/// Hosts accepted by the harvest whitelist by default
pub const DEFAULT_WHITELIST: &[&str] = &[
    "youtube.com",
    "youtu.be",
    "instagram.com",
    "facebook.com",
    "fb.watch",
    "tiktok.com",
];

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Content folders
    pub content: ContentConfig,

    /// Registry document location
    pub registry: RegistryConfig,

    /// Primary rotation policy
    pub rotation: RotationConfig,

    /// Publishing, retries and rate limiting
    pub publish: PublishConfig,

    /// Category alternation
    pub alternation: AlternationConfig,

    /// Backlog harvesting
    pub harvest: HarvestConfig,

    /// Post text rendering
    pub render: RenderConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Content folder layout
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    /// Folder with primary `.txt` items
    pub primary_dir: PathBuf,

    /// Folder with secondary items waiting to be published
    pub pending_dir: PathBuf,

    /// Folder secondary items are moved to after publishing
    pub consumed_dir: PathBuf,

    /// File name prefix of secondary items (`<prefix>-NNN.txt`)
    pub secondary_prefix: String,

    /// Zero-padding width of the secondary number
    pub number_width: usize,
}

/// Registry document configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Path of the JSON registry
    pub path: PathBuf,
}

/// Rotation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationConfig {
    /// Selection policy
    pub mode: RotationMode,

    /// Number of recent primary ids that are not repeated
    pub recent_window: usize,

    /// Fixed RNG seed (reproducible selection)
    pub seed: Option<u64>,
}

/// Publishing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    /// Actuation attempts per cycle
    pub max_attempts: u32,

    /// Delay between attempts in seconds
    pub retry_delay_secs: u64,

    /// Minimum minutes between successful publications
    pub min_interval_minutes: i64,

    /// Honor `--force` requests
    pub allow_force: bool,

    /// External program that performs the publication
    pub actuator_command: Option<String>,

    /// Arguments passed to the actuator program
    pub actuator_args: Vec<String>,

    /// Seconds before a running actuator is killed
    pub actuator_timeout_secs: u64,
}

/// Alternation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlternationConfig {
    /// Alternate primary and secondary publications
    pub enabled: bool,
}

/// Harvest configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// Exported chat transcript to harvest from
    pub source_path: Option<PathBuf>,

    /// Identifier recorded in harvest events
    pub source_id: String,

    /// Only harvest messages from this sender
    pub author: Option<String>,

    /// Messages revealed per step
    pub window_size: usize,

    /// Target size of the pending backlog
    pub quota: usize,

    /// Replenish after a cycle when the backlog drops below this
    pub low_water: usize,

    /// Consecutive steps without new items before giving up
    pub stall_limit: u32,

    /// Absolute number of steps per session
    pub max_steps: u32,

    /// Accepted hosts (subdomains included)
    pub whitelist: Vec<String>,
}

/// Rendering configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Append the publication date to primary posts
    pub date_stamp: bool,

    /// chrono format string for the date stamp
    pub date_format: String,

    /// Hashtag line appended to posts
    pub hashtags: Option<String>,

    /// Signature appended to primary posts
    pub signature: Option<String>,

    /// Line placed before secondary captions
    pub secondary_intro: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, pretty, json)
    pub format: String,
}

// ============================================================================
// Defaults
// ============================================================================

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            primary_dir: PathBuf::from("content/primary"),
            pending_dir: PathBuf::from("content/pending"),
            consumed_dir: PathBuf::from("content/consumed"),
            secondary_prefix: String::from("item"),
            number_width: 3,
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/registry.json"),
        }
    }
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            mode: RotationMode::Random,
            recent_window: DEFAULT_RECENT_WINDOW,
            seed: None,
        }
    }
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay_secs: 10,
            min_interval_minutes: 60,
            allow_force: true,
            actuator_command: None,
            actuator_args: Vec::new(),
            actuator_timeout_secs: 180,
        }
    }
}

impl Default for AlternationConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            source_path: None,
            source_id: String::from("chat-export"),
            author: None,
            window_size: 20,
            quota: 10,
            low_water: 5,
            stall_limit: 3,
            max_steps: 50,
            whitelist: DEFAULT_WHITELIST.iter().map(|h| h.to_string()).collect(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            date_stamp: true,
            date_format: String::from("%d/%m/%Y"),
            hashtags: None,
            signature: None,
            secondary_intro: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load configuration from defaults, an optional file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        config
            .apply_env_overrides()
            .context("Invalid HOMILY_* environment override")?;

        Ok(config)
    }

    /// Load configuration from defaults and the environment only
    pub fn from_env() -> Result<Self> {
        Self::load(None)
    }

    /// Override fields from `HOMILY_*` environment variables
    pub fn apply_env_overrides(&mut self) -> crate::error::Result<()> {
        if let Some(v) = env_string("HOMILY_PRIMARY_DIR") {
            self.content.primary_dir = v.into();
        }
        if let Some(v) = env_string("HOMILY_PENDING_DIR") {
            self.content.pending_dir = v.into();
        }
        if let Some(v) = env_string("HOMILY_CONSUMED_DIR") {
            self.content.consumed_dir = v.into();
        }
        if let Some(v) = env_string("HOMILY_REGISTRY_PATH") {
            self.registry.path = v.into();
        }

        if let Some(v) = env_string("HOMILY_ROTATION_MODE") {
            self.rotation.mode = RotationMode::from_str(&v)?;
        }
        if let Some(v) = env_parse("HOMILY_RECENT_WINDOW")? {
            self.rotation.recent_window = v;
        }

        if let Some(v) = env_parse("HOMILY_MAX_ATTEMPTS")? {
            self.publish.max_attempts = v;
        }
        if let Some(v) = env_parse("HOMILY_RETRY_DELAY_SECS")? {
            self.publish.retry_delay_secs = v;
        }
        if let Some(v) = env_parse("HOMILY_MIN_INTERVAL_MINUTES")? {
            self.publish.min_interval_minutes = v;
        }
        if let Some(v) = env_bool("HOMILY_ALLOW_FORCE")? {
            self.publish.allow_force = v;
        }
        if let Some(v) = env_string("HOMILY_ACTUATOR_COMMAND") {
            self.publish.actuator_command = Some(v);
        }

        if let Some(v) = env_bool("HOMILY_ALTERNATION")? {
            self.alternation.enabled = v;
        }

        if let Some(v) = env_string("HOMILY_HARVEST_SOURCE") {
            self.harvest.source_path = Some(v.into());
        }
        if let Some(v) = env_parse("HOMILY_HARVEST_QUOTA")? {
            self.harvest.quota = v;
        }

        if let Some(v) = env_string("HOMILY_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = env_string("HOMILY_LOG_FORMAT") {
            self.logging.format = v;
        }

        Ok(())
    }

    // ========================================================================
    // Validation
    // ========================================================================

    /// Validate configuration values
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.publish.max_attempts == 0 {
            return Err(Error::config("publish.max_attempts must be at least 1"));
        }

        if self.publish.min_interval_minutes < 0 {
            return Err(crate::scheduler::SchedulerError::InvalidInterval {
                minutes: self.publish.min_interval_minutes,
            }
            .into());
        }

        if self.rotation.recent_window == 0 {
            return Err(crate::scheduler::SchedulerError::InvalidWindow {
                size: self.rotation.recent_window,
            }
            .into());
        }

        if self.harvest.whitelist.is_empty() {
            return Err(Error::config("harvest.whitelist must not be empty"));
        }

        if self.harvest.window_size == 0 {
            return Err(Error::config("harvest.window_size must be at least 1"));
        }

        if self.harvest.stall_limit == 0 || self.harvest.max_steps == 0 {
            return Err(Error::config(
                "harvest.stall_limit and harvest.max_steps must be at least 1",
            ));
        }

        if self.harvest.quota < self.harvest.low_water {
            return Err(Error::config(format!(
                "harvest.quota ({}) must not be below harvest.low_water ({})",
                self.harvest.quota, self.harvest.low_water
            )));
        }

        if self.content.secondary_prefix.trim().is_empty() {
            return Err(Error::config("content.secondary_prefix must not be empty"));
        }

        if !crate::render::is_valid_date_format(&self.render.date_format) {
            return Err(Error::config(format!(
                "render.date_format '{}' is not a valid date format",
                self.render.date_format
            )));
        }

        if !matches!(self.logging.format.as_str(), "text" | "pretty" | "json") {
            return Err(Error::config(format!(
                "logging.format '{}' is not one of text, pretty, json",
                self.logging.format
            )));
        }

        Ok(())
    }

    /// Validate everything a publish run needs
    pub fn validate_for_publish(&self) -> crate::error::Result<()> {
        self.validate()?;

        match self.publish.actuator_command.as_deref() {
            Some(cmd) if !cmd.trim().is_empty() => Ok(()),
            _ => Err(Error::config(
                "publish.actuator_command is required to publish",
            )),
        }
    }

    /// Delay between actuation attempts
    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.publish.retry_delay_secs)
    }

    /// Minimum interval between successful publications
    #[must_use]
    pub fn min_interval(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.publish.min_interval_minutes)
    }

    /// Actuator timeout
    #[must_use]
    pub fn actuator_timeout(&self) -> Duration {
        Duration::from_secs(self.publish.actuator_timeout_secs)
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: FromStr>(key: &str) -> crate::error::Result<Option<T>> {
    match env_string(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| Error::config(format!("{key}: cannot parse '{raw}'"))),
        None => Ok(None),
    }
}

fn env_bool(key: &str) -> crate::error::Result<Option<bool>> {
    match env_string(key) {
        Some(raw) => match raw.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" | "si" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => Err(Error::config(format!("{key}: '{raw}' is not a boolean"))),
        },
        None => Ok(None),
    }
}
