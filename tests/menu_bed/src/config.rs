use image_loader::LoaderConfig;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::BedError;

const DEFAULT_VISIBLE_ROWS: usize = 4;

#[derive(Deserialize, Debug, Default)]
pub struct BedConfig {
    workers: Option<usize>,
    timeout_ms: Option<u64>,
    max_body_bytes: Option<u64>,
    cache_capacity: Option<usize>,
    visible_rows: Option<usize>,
}

impl BedConfig {
    pub fn load(path: &Path) -> Result<Self, BedError> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, BedError> {
        Ok(json5::from_str(text)?)
    }

    pub fn loader_config(&self) -> LoaderConfig {
        let defaults = LoaderConfig::default();

        LoaderConfig {
            workers: self.workers.unwrap_or(defaults.workers).max(1),
            timeout: self
                .timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.timeout),
            max_body_bytes: self.max_body_bytes.unwrap_or(defaults.max_body_bytes),
            cache_capacity: self.cache_capacity.or(defaults.cache_capacity),
        }
    }

    pub fn visible_rows(&self) -> usize {
        self.visible_rows.unwrap_or(DEFAULT_VISIBLE_ROWS).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config = BedConfig::parse(
            r#"{
                // comment
                workers: 2,
                timeout_ms: 1500,
                cache_capacity: 8,
                visible_rows: 5,
            }"#,
        )
        .unwrap();

        let loader = config.loader_config();
        assert_eq!(loader.workers, 2);
        assert_eq!(loader.timeout, Duration::from_millis(1500));
        assert_eq!(loader.cache_capacity, Some(8));
        assert_eq!(loader.max_body_bytes, LoaderConfig::default().max_body_bytes);
        assert_eq!(config.visible_rows(), 5);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = BedConfig::parse("{}").unwrap();
        let loader = config.loader_config();

        assert_eq!(loader.workers, LoaderConfig::default().workers);
        assert_eq!(loader.cache_capacity, None);
        assert_eq!(config.visible_rows(), DEFAULT_VISIBLE_ROWS);
    }

    #[test]
    fn test_zero_workers_clamped() {
        let config = BedConfig::parse("{ workers: 0 }").unwrap();
        assert_eq!(config.loader_config().workers, 1);
    }

    #[test]
    fn test_bad_config() {
        assert!(matches!(
            BedConfig::parse("{ workers: \"many\" }"),
            Err(BedError::Config(_))
        ));
    }
}
