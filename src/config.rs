use std::time::Duration;

use serde::Deserialize;

use crate::{error::ConfigError, glue::GlueConfig};

/// Settings for one throttle/glue/exporter pipeline.
///
/// ```toml
/// rate = 5000
/// chunk_size = 65536
/// chunk_timeout = "1s"
/// url = "http://127.0.0.1:2003/ingest"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Points per second. Zero or negative disables throttling.
    pub rate: i64,
    pub chunk_size: usize,
    #[serde(with = "humantime_serde")]
    pub chunk_timeout: Duration,
    /// Chunks go to stdout when unset.
    pub url: Option<String>,
    /// Chunks the exporter may hold before dropping new ones.
    pub queue_len: usize,
}
impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            rate: 0,
            chunk_size: 64 * 1024,
            chunk_timeout: Duration::from_secs(1),
            url: None,
            queue_len: 64,
        }
    }
}
impl PipelineConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.glue_config()?;
        if self.queue_len == 0 {
            return Err(ConfigError::ZeroQueueLen);
        }
        Ok(())
    }

    pub fn glue_config(&self) -> Result<GlueConfig, ConfigError> {
        GlueConfig::new(self.chunk_size, self.chunk_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = PipelineConfig::from_toml_str("").unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn parses_human_durations() {
        let config = PipelineConfig::from_toml_str(
            r#"
            rate = 1500
            chunk_size = 1000
            chunk_timeout = "50ms"
            url = "http://localhost:8080/"
            "#,
        )
        .unwrap();
        assert_eq!(config.rate, 1500);
        assert_eq!(config.chunk_timeout, Duration::from_millis(50));
        assert_eq!(config.url.as_deref(), Some("http://localhost:8080/"));
        let glue = config.glue_config().unwrap();
        assert_eq!(glue.chunk_size(), 1000);
    }

    #[test]
    fn negative_rate_is_accepted() {
        let config = PipelineConfig::from_toml_str("rate = -1").unwrap();
        assert_eq!(config.rate, -1);
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(matches!(
            PipelineConfig::from_toml_str("chunk_size = 0"),
            Err(ConfigError::ZeroChunkSize)
        ));
        assert!(matches!(
            PipelineConfig::from_toml_str(r#"chunk_timeout = "0s""#),
            Err(ConfigError::ZeroChunkTimeout)
        ));
        assert!(matches!(
            PipelineConfig::from_toml_str("queue_len = 0"),
            Err(ConfigError::ZeroQueueLen)
        ));
        assert!(matches!(
            PipelineConfig::from_toml_str("bogus = 1"),
            Err(ConfigError::Parse(_))
        ));
    }
}
