//! Command line interface
//!
//! The positional form `serialgraph PORT BAUD [DELIMITER [COLUMN_MODE]]` is
//! kept for muscle memory; everything else is an optional `--flag` that
//! overrides the config file.

use crate::config::{parse_delimiter, AppConfig};
use crate::types::ColumnMode;
use clap::{CommandFactory, Parser};
use std::ffi::OsString;
use std::path::PathBuf;

/// Words that request usage instead of a session
const HELP_WORDS: &[&str] = &["-h", "-help", "--help", "help"];

/// Tracing filter without `-v`; per-line diagnostics stay at `trace`
pub const DEFAULT_LOG_FILTER: &str = "info,serialgraph=debug";

#[derive(Parser, Debug, Clone, PartialEq)]
#[command(
    name = "serialgraph",
    version,
    about = "Live plot and log delimited numeric data from a serial port",
    long_about = "Live plot and log delimited numeric data from a serial port.\n\
                  The number of columns is detected from the first lines received.\n\
                  Every accepted row is appended to a CSV log (Log.csv by default).",
    disable_help_flag = true
)]
pub struct Cli {
    /// Serial port, e.g. COM3 or /dev/ttyUSB0
    #[arg(requires = "baud")]
    pub port: Option<String>,

    /// Baud rate
    pub baud: Option<u32>,

    /// Field delimiter; accepts \t, tab, comma, space, semicolon
    pub delimiter: Option<String>,

    /// 0: plot every column against time, 1: first column is the x axis
    #[arg(value_parser = clap::value_parser!(u8).range(0..=1))]
    pub column_mode: Option<u8>,

    /// TOML config file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Smallest accepted reading
    #[arg(long, allow_negative_numbers = true)]
    pub min_range: Option<f64>,

    /// Largest accepted reading
    #[arg(long, allow_negative_numbers = true)]
    pub max_range: Option<f64>,

    /// Number of most recent samples drawn
    #[arg(long, value_name = "SAMPLES")]
    pub window: Option<usize>,

    /// Fixed column count (skips detection)
    #[arg(long)]
    pub columns: Option<usize>,

    /// CSV log file
    #[arg(long, value_name = "FILE", conflicts_with = "no_log")]
    pub log_file: Option<PathBuf>,

    /// Do not write a log file
    #[arg(long)]
    pub no_log: bool,

    /// Disconnection grace period in milliseconds
    #[arg(long, value_name = "MS")]
    pub grace_ms: Option<u64>,

    /// Print periodic summaries instead of opening a window
    #[arg(long)]
    pub headless: bool,

    /// Use a built-in synthetic signal instead of a serial port
    #[arg(long)]
    pub demo: bool,

    /// List serial ports and exit
    #[arg(long)]
    pub list_ports: bool,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// What the process should do after argument parsing
#[derive(Debug, Clone, PartialEq)]
pub enum CliAction {
    /// Print usage and exit successfully
    Help,
    /// Start a session (or list ports)
    Run(Cli),
}

/// Parse arguments, `args[0]` being the program name
pub fn parse_args<I, T>(args: I) -> Result<CliAction, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
    // only the first argument is a help word; later ones may be values
    let wants_help = args
        .get(1)
        .and_then(|a| a.to_str())
        .is_some_and(|s| HELP_WORDS.contains(&s));
    if wants_help {
        return Ok(CliAction::Help);
    }
    Cli::try_parse_from(args).map(CliAction::Run)
}

/// Full usage text
pub fn usage() -> String {
    Cli::command().render_long_help().to_string()
}

impl Cli {
    /// Overlay command line values onto `config`
    pub fn apply_to(&self, config: &mut AppConfig) {
        if let Some(port) = &self.port {
            config.serial.port = port.clone();
        }
        if let Some(baud) = self.baud {
            config.serial.baud_rate = baud;
        }
        if let Some(delimiter) = &self.delimiter {
            config.parsing.delimiter = parse_delimiter(delimiter);
        }
        if let Some(mode) = self.column_mode.and_then(ColumnMode::from_index) {
            config.render.column_mode = mode;
        }
        if let Some(min) = self.min_range {
            config.parsing.min_range = min;
        }
        if let Some(max) = self.max_range {
            config.parsing.max_range = max;
        }
        if let Some(window) = self.window {
            config.render.sample_window = window;
        }
        if let Some(columns) = self.columns {
            config.detection.columns = Some(columns);
        }
        if let Some(path) = &self.log_file {
            config.log.enabled = true;
            config.log.path = path.clone();
        }
        if self.no_log {
            config.log.enabled = false;
        }
        if let Some(grace) = self.grace_ms {
            config.acquisition.grace_period_ms = grace;
        }
    }

    /// Default tracing filter for the chosen verbosity
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => DEFAULT_LOG_FILTER,
            1 => "info,serialgraph=trace",
            _ => "trace",
        }
    }
}
