//! Configuration loading and config file resolution
//!
//! Configuration sources, highest priority first:
//! 1. Command-line argument (`--config`)
//! 2. Environment variable (`RCK_CONFIG`)
//! 3. Platform config file (`<config dir>/rck/config.toml`)
//! 4. Built-in defaults (code constants)
//!
//! A missing config file is never fatal unless it was named explicitly on
//! the command line. Every field has a default, so a partial file is fine.

use crate::time::millis_to_duration;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "RCK_CONFIG";

/// Highest accepted `tuning.frame_rate_hz`
pub const MAX_FRAME_RATE_HZ: u32 = 1_000;

/// Complete TOML configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Remote check-in API
    pub api: ApiConfig,

    /// Camera capture preferences
    pub scanner: ScannerConfig,

    /// Retry, debounce and display timings
    pub tuning: PipelineTuning,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Remote check-in API configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Web app endpoint; the route is passed as a `path` query parameter
    pub base_url: String,

    /// Runner session token injected into authenticated requests
    pub line_token: Option<String>,
}

/// Preferred camera direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// Back-facing camera
    Environment,
    /// Front-facing (selfie) camera
    User,
}

impl std::fmt::Display for FacingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FacingMode::Environment => write!(f, "environment"),
            FacingMode::User => write!(f, "user"),
        }
    }
}

/// Camera capture preferences
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    pub facing_mode: FacingMode,
    pub ideal_width: u32,
    pub ideal_height: u32,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            facing_mode: FacingMode::Environment,
            ideal_width: 1280,
            ideal_height: 720,
        }
    }
}

/// Pipeline tuning values
///
/// Product tuning, not invariants. Defaults match what the check-in desk
/// shipped with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineTuning {
    /// Additional camera acquisition attempts after the first failure
    pub acquire_retries: u32,
    /// Delay before each acquisition retry
    pub acquire_retry_delay_ms: u64,
    /// Delay before retrying a sink that refused to start
    pub play_retry_delay_ms: u64,
    /// Blanket cooldown after any accepted decode
    pub scan_cooldown_ms: u64,
    /// Suppression window for the previously accepted payload
    pub same_payload_window_ms: u64,
    /// How long a format error stays on screen
    pub format_error_hold_ms: u64,
    /// How long a success/failure result stays on screen
    pub result_hold_ms: u64,
    /// Check-in attempts kept in the in-memory history
    pub history_capacity: usize,
    /// Host display refresh rate driving decode cycles
    pub frame_rate_hz: u32,
}

impl Default for PipelineTuning {
    fn default() -> Self {
        Self {
            acquire_retries: 2,
            acquire_retry_delay_ms: 500,
            play_retry_delay_ms: 300,
            scan_cooldown_ms: 3_000,
            same_payload_window_ms: 10_000,
            format_error_hold_ms: 2_500,
            result_hold_ms: 3_000,
            history_capacity: 20,
            frame_rate_hz: 60,
        }
    }
}

impl PipelineTuning {
    pub fn acquire_retry_delay(&self) -> Duration {
        millis_to_duration(self.acquire_retry_delay_ms)
    }

    pub fn play_retry_delay(&self) -> Duration {
        millis_to_duration(self.play_retry_delay_ms)
    }

    pub fn scan_cooldown(&self) -> Duration {
        millis_to_duration(self.scan_cooldown_ms)
    }

    pub fn same_payload_window(&self) -> Duration {
        millis_to_duration(self.same_payload_window_ms)
    }

    pub fn format_error_hold(&self) -> Duration {
        millis_to_duration(self.format_error_hold_ms)
    }

    pub fn result_hold(&self) -> Duration {
        millis_to_duration(self.result_hold_ms)
    }

    /// Reject combinations the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.frame_rate_hz == 0 || self.frame_rate_hz > MAX_FRAME_RATE_HZ {
            return Err(Error::Config(format!(
                "tuning.frame_rate_hz must be between 1 and {} (got {})",
                MAX_FRAME_RATE_HZ, self.frame_rate_hz
            )));
        }
        if self.history_capacity == 0 {
            return Err(Error::Config(
                "tuning.history_capacity must be > 0".to_string(),
            ));
        }
        if self.same_payload_window_ms < self.scan_cooldown_ms {
            return Err(Error::Config(format!(
                "tuning.same_payload_window_ms ({}) is shorter than tuning.scan_cooldown_ms ({})",
                self.same_payload_window_ms, self.scan_cooldown_ms
            )));
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl TomlConfig {
    /// Parse and validate configuration text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(text)?;
        config.tuning.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Serialize back to TOML (used to print an effective config)
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Internal(e.to_string()))
    }
}

/// Resolve which config file to read, following the priority order above
///
/// Returns `None` when no source names an existing file.
pub fn resolve_config_path(cli_arg: Option<&Path>, env_var_name: &str) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
        warn!(
            "{} points at missing file {}, ignoring",
            env_var_name,
            path.display()
        );
    }

    // Priority 3: Platform config file
    default_config_path().filter(|path| path.exists())
}

/// Platform config file location (`~/.config/rck/config.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("rck").join("config.toml"))
}

/// Load configuration from the resolved source, or fall back to defaults
///
/// An explicitly named file (CLI) must exist and parse. Anything found
/// through the environment or the platform location must parse.
pub fn load_config(cli_arg: Option<&Path>) -> Result<TomlConfig> {
    match resolve_config_path(cli_arg, CONFIG_ENV_VAR) {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            TomlConfig::load(&path)
        }
        None => {
            info!("No configuration file found, using built-in defaults");
            Ok(TomlConfig::default())
        }
    }
}
