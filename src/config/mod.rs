//! Persistent runtime settings for the scheduler, ledger and CLI.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    currency::CurrencyCode,
    errors::LedgerError,
    utils::{
        app_data_dir, ensure_dir,
        persistence::{load_json, save_json},
    },
};

const CONFIG_DIR: &str = "config";
const CONFIG_FILE: &str = "config.json";
const DATA_DIR: &str = "data";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    #[error("Configuration storage failed: {0}")]
    Storage(#[from] LedgerError),
    #[error("Configuration I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    #[default]
    Json,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub poll_interval_secs: u64,
    pub base_currency: String,
    pub reporting_currencies: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    pub storage: StorageKind,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval_secs: 60,
            base_currency: "USD".into(),
            reporting_currencies: vec!["USD".into(), "EUR".into()],
            data_dir: None,
            storage: StorageKind::Json,
        }
    }
}

impl Config {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn base_currency(&self) -> CurrencyCode {
        CurrencyCode::new(self.base_currency.as_str())
    }

    pub fn reporting_currencies(&self) -> Vec<CurrencyCode> {
        self.reporting_currencies
            .iter()
            .map(|code| CurrencyCode::new(code.as_str()))
            .collect()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "poll_interval_secs must be at least 1".into(),
            ));
        }
        let codes = std::iter::once(&self.base_currency).chain(self.reporting_currencies.iter());
        for code in codes {
            let trimmed = code.trim();
            if trimmed.len() != 3 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(ConfigError::Invalid(format!(
                    "`{code}` is not a three-letter currency code"
                )));
            }
        }
        Ok(())
    }
}

/// Loads and saves `config/config.json` under the application directory.
pub struct ConfigManager {
    base: PathBuf,
    path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self, ConfigError> {
        Self::with_base_dir(app_data_dir())
    }

    pub fn with_base_dir(base: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let base = base.into();
        ensure_dir(&base)?;
        let config_root = base.join(CONFIG_DIR);
        ensure_dir(&config_root)?;
        Ok(Self {
            path: config_root.join(CONFIG_FILE),
            base,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the stored configuration, or defaults when none was saved yet.
    pub fn load(&self) -> Result<Config, ConfigError> {
        let config = load_json::<Config>(&self.path)?.unwrap_or_default();
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        config.validate()?;
        save_json(config, &self.path)?;
        tracing::debug!(path = %self.path.display(), "configuration saved");
        Ok(())
    }

    /// Directory for JSON storage; `data_dir` wins over the default `<base>/data`.
    pub fn data_dir(&self, config: &Config) -> PathBuf {
        config
            .data_dir
            .clone()
            .unwrap_or_else(|| self.base.join(DATA_DIR))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.poll_interval(), Duration::from_secs(60));
        assert_eq!(config.base_currency().as_str(), "USD");
        assert_eq!(config.reporting_currencies().len(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_poll_interval_is_invalid() {
        let config = Config {
            poll_interval_secs: 0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = serde_json::from_str(r#"{"poll_interval_secs": 5}"#).unwrap();
        assert_eq!(parsed.poll_interval_secs, 5);
        assert_eq!(parsed.storage, StorageKind::Json);
        assert_eq!(parsed.base_currency, "USD");
    }
}
