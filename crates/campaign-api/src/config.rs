//! Configuration loaded from environment variables.

use std::env;
use std::net::SocketAddr;
use std::num::NonZeroUsize;

use campaign_dispatcher::EngineOptions;

/// Campaign API server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address.
    pub addr: SocketAddr,
    /// SQLite database URL.
    pub database_url: String,
    /// Dispatch engine tunables.
    pub engine: EngineOptions,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `CAMPAIGN_API_ADDR` | Server bind address | `127.0.0.1:8790` |
    /// | `SQLITE_PATH` | SQLite database URL | `sqlite:clinic.db?mode=rwc` |
    /// | `STATUS_CHECK_EVERY` | Recipients between campaign status reads | `1` |
    /// | `SKIP_ONLY_SUCCESSFUL` | Retry recipients whose earlier attempt failed | `false` |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let addr = var("CAMPAIGN_API_ADDR")
            .unwrap_or_else(|| "127.0.0.1:8790".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidAddr)?;

        let database_url =
            var("SQLITE_PATH").unwrap_or_else(|| "sqlite:clinic.db?mode=rwc".to_string());

        let status_check_every = match var("STATUS_CHECK_EVERY") {
            Some(raw) => raw
                .trim()
                .parse::<NonZeroUsize>()
                .map_err(|_| ConfigError::InvalidStatusCheckEvery(raw))?,
            None => NonZeroUsize::MIN,
        };

        let skip_only_successful = match var("SKIP_ONLY_SUCCESSFUL") {
            Some(raw) => parse_flag(&raw).ok_or(ConfigError::InvalidSkipOnlySuccessful(raw))?,
            None => false,
        };

        Ok(Self {
            addr,
            database_url,
            engine: EngineOptions {
                status_check_every,
                skip_only_successful,
            },
        })
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid CAMPAIGN_API_ADDR format")]
    InvalidAddr,

    #[error("STATUS_CHECK_EVERY must be a positive integer, got {0:?}")]
    InvalidStatusCheckEvery(String),

    #[error("SKIP_ONLY_SUCCESSFUL must be true or false, got {0:?}")]
    InvalidSkipOnlySuccessful(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.addr.to_string(), "127.0.0.1:8790");
        assert_eq!(config.database_url, "sqlite:clinic.db?mode=rwc");
        assert_eq!(config.engine, EngineOptions::default());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("CAMPAIGN_API_ADDR", "0.0.0.0:9000"),
            ("STATUS_CHECK_EVERY", "5"),
            ("SKIP_ONLY_SUCCESSFUL", "TRUE"),
        ])
        .unwrap();
        assert_eq!(config.addr.port(), 9000);
        assert_eq!(config.engine.status_check_every.get(), 5);
        assert!(config.engine.skip_only_successful);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            load(&[("CAMPAIGN_API_ADDR", "nowhere")]),
            Err(ConfigError::InvalidAddr)
        ));
        assert!(matches!(
            load(&[("STATUS_CHECK_EVERY", "0")]),
            Err(ConfigError::InvalidStatusCheckEvery(_))
        ));
        assert!(matches!(
            load(&[("SKIP_ONLY_SUCCESSFUL", "maybe")]),
            Err(ConfigError::InvalidSkipOnlySuccessful(_))
        ));
    }
}
