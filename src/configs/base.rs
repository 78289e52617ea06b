use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    common::types::AnyResult,
    configs::{CullingConfig, LoggingConfig},
};

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    pub logging: Option<LoggingConfig>,
    #[serde(default)]
    pub culling: CullingConfig,
}

impl Config {
    pub fn load() -> AnyResult<Self> {
        let config_path = if std::path::Path::new("config.toml").exists() {
            "config.toml"
        } else if std::path::Path::new("config.default.toml").exists() {
            "config.default.toml"
        } else {
            return Err("config.toml or config.default.toml not found".into());
        };

        let config_str = std::fs::read_to_string(config_path)?;
        if config_str.is_empty() {
            return Err(format!("{} is empty", config_path).into());
        }

        Self::parse(&config_str)
    }

    pub fn parse(config_str: &str) -> AnyResult<Self> {
        let config: Config = toml::from_str(config_str)?;
        Ok(config)
    }

    /// Period between idle-culling cycles.
    pub fn culling_interval(&self) -> Duration {
        self.culling.interval()
    }

    /// Upper bound on waiting for an in-flight culling cycle at shutdown.
    pub fn culling_shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.culling.shutdown_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert!(config.logging.is_none());
        assert_eq!(config.culling_interval(), Duration::from_secs(5 * 60));
        assert_eq!(config.culling_shutdown_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn reads_culling_and_logging_sections() {
        let config = Config::parse(
            r#"
            [logging]
            level = "debug"

            [culling]
            span_minutes = 2
            shutdown_timeout_secs = 10
            "#,
        )
        .unwrap();

        assert_eq!(
            config.logging.as_ref().and_then(|l| l.level.as_deref()),
            Some("debug")
        );
        assert_eq!(config.culling_interval(), Duration::from_secs(120));
        assert_eq!(config.culling_shutdown_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn non_positive_span_falls_back_to_five_minutes() {
        for span in ["0", "-3"] {
            let config = Config::parse(&format!("[culling]\nspan_minutes = {span}")).unwrap();
            assert_eq!(config.culling_interval(), Duration::from_secs(300));
        }
    }

    #[test]
    fn huge_span_is_capped_instead_of_wrapping() {
        let config = Config::parse(&format!("[culling]\nspan_minutes = {}", i64::MAX)).unwrap();
        assert_eq!(
            config.culling_interval(),
            Duration::from_secs(60 * 60 * 24 * 365)
        );
    }

    #[test]
    fn malformed_document_is_an_error() {
        assert!(Config::parse("[culling]\nspan_minutes = \"soon\"").is_err());
    }
}
