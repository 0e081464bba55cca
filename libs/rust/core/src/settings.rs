use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;

use crate::resilience::RetryConfig;

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RetrySettings {
    pub max_retries: usize,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter: f64,
}

impl From<&RetrySettings> for RetryConfig {
    fn from(s: &RetrySettings) -> Self {
        RetryConfig { max_retries: s.max_retries, base_delay: Duration::from_millis(s.base_delay_ms), max_delay: Duration::from_millis(s.max_delay_ms), jitter: s.jitter }
    }
}

/// Connection settings for the platform.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ClientConfig {
    pub api_url: String,
    pub platform_url: String,
    pub api_token: Option<String>,
    pub timeout_secs: u64,
    pub retry: RetrySettings,
}

impl ClientConfig {
    /// Defaults, then the file named by `EVALKIT_CONFIG_FILE` (if any), then `EVALKIT__*` variables,
    /// e.g. `EVALKIT__API_TOKEN` or `EVALKIT__RETRY__MAX_RETRIES`.
    pub fn load() -> Result<Self> {
        let mut builder = Self::defaults()?;
        if let Ok(file) = std::env::var("EVALKIT_CONFIG_FILE") {
            builder = builder.add_source(config::File::with_name(&file).required(false));
        }
        builder = builder.add_source(config::Environment::with_prefix("EVALKIT").prefix_separator("__").separator("__"));
        Ok(builder.build()?.try_deserialize()?)
    }

    /// Defaults overlaid with a YAML document.
    pub fn from_yaml(text: &str) -> Result<Self> {
        let builder = Self::defaults()?.add_source(config::File::from_str(text, config::FileFormat::Yaml));
        Ok(builder.build()?.try_deserialize()?)
    }

    fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        Ok(config::Config::builder()
            .set_default("api_url", "http://localhost:8000/api/v1")?
            .set_default("platform_url", "http://localhost:3000")?
            .set_default("timeout_secs", 60)?
            .set_default("retry.max_retries", 3)?
            .set_default("retry.base_delay_ms", 100)?
            .set_default("retry.max_delay_ms", 2000)?
            .set_default("retry.jitter", 0.25)?)
    }

    pub fn timeout(&self) -> Duration { Duration::from_secs(self.timeout_secs) }
    pub fn retry_config(&self) -> RetryConfig { RetryConfig::from(&self.retry) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply() {
        let cfg = ClientConfig::from_yaml("{}").unwrap();
        assert_eq!(cfg.api_url, "http://localhost:8000/api/v1");
        assert_eq!(cfg.api_token, None);
        assert_eq!(cfg.timeout(), Duration::from_secs(60));
        assert_eq!(cfg.retry_config(), RetryConfig::default());
    }

    #[test]
    fn yaml_overrides() {
        let cfg = ClientConfig::from_yaml("api_url: https://api.example.test/v1\napi_token: tok\nretry:\n  max_retries: 0\n").unwrap();
        assert_eq!(cfg.api_url, "https://api.example.test/v1");
        assert_eq!(cfg.api_token.as_deref(), Some("tok"));
        assert_eq!(cfg.retry.max_retries, 0);
        assert_eq!(cfg.retry.max_delay_ms, 2000);
    }
}
