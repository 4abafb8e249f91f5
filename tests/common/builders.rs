//! Test data builders for creating test objects

use serialgraph::config::AppConfig;
use serialgraph::types::ColumnMode;
use std::path::PathBuf;

/// Builder for session configs tuned for fast tests
pub struct ConfigBuilder {
    config: AppConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        let mut config = AppConfig::default();
        config.parsing.delimiter = ",".to_string();
        config.acquisition.poll_interval_ms = 1;
        config.acquisition.stats_interval_ms = 20;
        config.detection.timeout_ms = 500;
        config.log.enabled = false;
        Self { config }
    }

    pub fn delimiter(mut self, delimiter: &str) -> Self {
        self.config.parsing.delimiter = delimiter.to_string();
        self
    }

    pub fn columns(mut self, columns: usize) -> Self {
        self.config.detection.columns = Some(columns);
        self
    }

    pub fn detection_lines(mut self, lines: usize) -> Self {
        self.config.detection.max_lines = lines;
        self
    }

    pub fn range(mut self, min: f64, max: f64) -> Self {
        self.config.parsing.min_range = min;
        self.config.parsing.max_range = max;
        self
    }

    pub fn grace_ms(mut self, grace: u64) -> Self {
        self.config.acquisition.grace_period_ms = grace;
        self
    }

    pub fn window(mut self, window: usize) -> Self {
        self.config.render.sample_window = window;
        self
    }

    pub fn column_mode(mut self, mode: ColumnMode) -> Self {
        self.config.render.column_mode = mode;
        self
    }

    pub fn log_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.log.enabled = true;
        self.config.log.path = path.into();
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_overrides() {
        let config = ConfigBuilder::new().columns(3).range(0.0, 10.0).build();
        assert_eq!(config.detection.columns, Some(3));
        assert_eq!(config.parsing.max_range, 10.0);
        assert!(config.validate().is_ok());
    }
}
