//! Configuration module for serialgraph
//!
//! Settings come from three layers, later ones winning:
//!
//! 1. Built-in defaults (the values below)
//! 2. A TOML file: `--config FILE`, otherwise
//!    `<config_dir>/serialgraph/config.toml` when it exists
//! 3. Command line arguments (see [`crate::cli`])
//!
//! # Config Location
//!
//! - **Linux**: `~/.config/serialgraph/config.toml`
//! - **macOS**: `~/Library/Application Support/serialgraph/config.toml`
//! - **Windows**: `%APPDATA%\serialgraph\config.toml`
//!
//! # Example
//!
//! ```toml
//! [serial]
//! port = "/dev/ttyACM0"
//! baud_rate = 921600
//!
//! [parsing]
//! delimiter = ","
//! min_range = -1000.0
//! max_range = 1000.0
//!
//! [render]
//! sample_window = 2000
//! column_mode = "elapsed_time"
//! ```

use crate::error::{Result, SerialGraphError};
use crate::types::{ColumnMode, RangeLimits};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application identifier for config directories
pub const APP_ID: &str = "serialgraph";

/// Config filename inside the app config directory
pub const CONFIG_FILE: &str = "config.toml";

/// Default serial port
#[cfg(windows)]
pub const DEFAULT_PORT: &str = "COM3";
/// Default serial port
#[cfg(not(windows))]
pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";

/// Default baud rate
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default field delimiter
pub const DEFAULT_DELIMITER: &str = "\t";

/// Default number of most recent samples drawn per frame
pub const DEFAULT_SAMPLE_WINDOW: usize = 1000;

/// Default log file, relative to the working directory
pub const DEFAULT_LOG_FILE: &str = "Log.csv";

/// Default disconnection grace period in milliseconds
pub const DEFAULT_GRACE_PERIOD_MS: u64 = 2000;

/// Get the path of the default config file
pub fn default_config_path() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID).join(CONFIG_FILE))
}

/// Translate a delimiter given on the command line.
///
/// Shells make a literal tab awkward to type, so a few names and escapes are
/// accepted. Anything else is used verbatim.
pub fn parse_delimiter(raw: &str) -> String {
    match raw {
        "\\t" | "tab" | "TAB" => "\t".to_string(),
        "comma" => ",".to_string(),
        "space" => " ".to_string(),
        "semicolon" => ";".to_string(),
        "pipe" => "|".to_string(),
        other => other.to_string(),
    }
}

// ==================== Serial Config ====================

/// Serial transport settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// OS port identifier
    pub port: String,
    pub baud_rate: u32,
    /// Read timeout passed to the driver
    pub read_timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout_ms: 1000,
        }
    }
}

// ==================== Parsing Config ====================

/// Line splitting and range validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParsingConfig {
    pub delimiter: String,
    /// Smallest accepted reading (inclusive)
    pub min_range: f64,
    /// Largest accepted reading (inclusive)
    pub max_range: f64,
}

impl ParsingConfig {
    pub fn range(&self) -> RangeLimits {
        RangeLimits::new(self.min_range, self.max_range)
    }
}

impl Default for ParsingConfig {
    fn default() -> Self {
        let range = RangeLimits::default();
        Self {
            delimiter: DEFAULT_DELIMITER.to_string(),
            min_range: range.min,
            max_range: range.max,
        }
    }
}

// ==================== Detection Config ====================

/// Column detection budget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Lines sampled before electing a width
    pub max_lines: usize,
    /// Time budget in milliseconds
    pub timeout_ms: u64,
    /// Fixed column count; skips detection when set
    pub columns: Option<usize>,
}

impl DetectionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            max_lines: 50,
            timeout_ms: 5000,
            columns: None,
        }
    }
}

// ==================== Acquisition Config ====================

/// Acquisition loop timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// Sleep between empty polls
    pub poll_interval_ms: u64,
    /// How long the liveness probe may fail before the session ends
    pub grace_period_ms: u64,
    /// Interval between statistics events
    pub stats_interval_ms: u64,
    /// Capacity of the event channel to the frontend
    pub event_capacity: usize,
}

impl AcquisitionConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    pub fn stats_interval(&self) -> Duration {
        Duration::from_millis(self.stats_interval_ms)
    }
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5,
            grace_period_ms: DEFAULT_GRACE_PERIOD_MS,
            stats_interval_ms: 500,
            event_capacity: 1024,
        }
    }
}

// ==================== Render Config ====================

/// Plot settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Most recent samples drawn per frame
    pub sample_window: usize,
    pub column_mode: ColumnMode,
    /// Upper bound on the time between repaints while streaming
    pub repaint_interval_ms: u64,
    /// Interval between summaries in headless mode
    pub headless_interval_ms: u64,
    pub show_legend: bool,
    pub line_width: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            sample_window: DEFAULT_SAMPLE_WINDOW,
            column_mode: ColumnMode::default(),
            repaint_interval_ms: 16,
            headless_interval_ms: 1000,
            show_legend: true,
            line_width: 1.5,
        }
    }
}

// ==================== Log Config ====================

/// Row log settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub enabled: bool,
    pub path: PathBuf,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from(DEFAULT_LOG_FILE),
        }
    }
}

// ==================== App Config ====================

/// Complete application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub serial: SerialConfig,
    pub parsing: ParsingConfig,
    pub detection: DetectionConfig,
    pub acquisition: AcquisitionConfig,
    pub render: RenderConfig,
    pub log: LogConfig,
}

impl AppConfig {
    /// Load configuration.
    ///
    /// An explicit path must exist. Without one the default location is used
    /// when present, otherwise built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match default_config_path() {
                Some(path) if path.exists() => path,
                _ => {
                    tracing::debug!("No config file found, using defaults");
                    return Ok(Self::default());
                }
            },
        };
        Self::load_file(&path)
    }

    /// Load and parse a TOML config file
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            SerialGraphError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;
        let config = Self::from_toml(&content).map_err(|e| {
            SerialGraphError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;
        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse from TOML text
    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        let mut config: Self = toml::from_str(content)?;
        config.parsing.delimiter = parse_delimiter(&config.parsing.delimiter);
        Ok(config)
    }

    /// Render as TOML text
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| SerialGraphError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Reject settings the acquisition pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: &str| Err(SerialGraphError::Config(msg.to_string()));

        if self.serial.port.is_empty() {
            return fail("serial port must not be empty");
        }
        if self.serial.baud_rate == 0 {
            return fail("baud rate must be positive");
        }
        if self.parsing.delimiter.is_empty() {
            return fail("delimiter must not be empty");
        }
        if self.parsing.delimiter.contains('\n') {
            return fail("delimiter must not contain a line break");
        }
        if self.parsing.min_range.is_nan() || self.parsing.max_range.is_nan() {
            return fail("range bounds must be numbers");
        }
        if self.parsing.min_range > self.parsing.max_range {
            return Err(SerialGraphError::Config(format!(
                "min range {} is greater than max range {}",
                self.parsing.min_range, self.parsing.max_range
            )));
        }
        if self.detection.max_lines == 0 {
            return fail("detection needs at least one line");
        }
        if self.detection.columns == Some(0) {
            return fail("fixed column count must be positive");
        }
        if self.acquisition.poll_interval_ms == 0 {
            return fail("poll interval must be positive");
        }
        if self.acquisition.event_capacity == 0 {
            return fail("event channel capacity must be positive");
        }
        if self.render.sample_window == 0 {
            return fail("sample window must be positive");
        }
        if self.log.enabled && self.log.path.as_os_str().is_empty() {
            return fail("log file path must not be empty");
        }
        Ok(())
    }
}

// ==================== Tests ====================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.serial.baud_rate, 115_200);
        assert_eq!(config.parsing.delimiter, "\t");
        assert_eq!(config.parsing.range(), RangeLimits::new(-3e10, 3e10));
        assert_eq!(config.render.sample_window, 1000);
        assert_eq!(config.render.column_mode, ColumnMode::FirstColumn);
        assert_eq!(config.log.path, PathBuf::from("Log.csv"));
        assert_eq!(config.acquisition.grace_period(), Duration::from_secs(2));
        assert_eq!(config.detection.max_lines, 50);
        assert_eq!(config.detection.timeout(), Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [serial]
            port = "/dev/ttyACM0"

            [parsing]
            delimiter = "comma"
            max_range = 100.0
            "#,
        )
        .unwrap();
        assert_eq!(config.serial.port, "/dev/ttyACM0");
        assert_eq!(config.serial.baud_rate, DEFAULT_BAUD_RATE);
        assert_eq!(config.parsing.delimiter, ",");
        assert_eq!(config.parsing.max_range, 100.0);
        assert_eq!(config.parsing.min_range, -3e10);
    }

    #[test]
    fn test_column_mode_from_toml() {
        let config = AppConfig::from_toml("[render]\ncolumn_mode = \"elapsed_time\"\n").unwrap();
        assert_eq!(config.render.column_mode, ColumnMode::ElapsedTime);
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = AppConfig::default();
        config.detection.columns = Some(3);
        let text = config.to_toml().unwrap();
        assert_eq!(AppConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.parsing.delimiter.clear();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.parsing.min_range = 10.0;
        config.parsing.max_range = -10.0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.render.sample_window = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.serial.baud_rate = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.detection.columns = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_delimiter_escapes() {
        assert_eq!(parse_delimiter("\\t"), "\t");
        assert_eq!(parse_delimiter("tab"), "\t");
        assert_eq!(parse_delimiter("comma"), ",");
        assert_eq!(parse_delimiter("space"), " ");
        assert_eq!(parse_delimiter("semicolon"), ";");
        assert_eq!(parse_delimiter("::"), "::");
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let err = AppConfig::load(Some(Path::new("/nonexistent/serialgraph.toml"))).unwrap_err();
        assert!(matches!(err, SerialGraphError::Config(_)));
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[log]\nenabled = false\n").unwrap();
        let config = AppConfig::load(Some(&path)).unwrap();
        assert!(!config.log.enabled);
    }
}
