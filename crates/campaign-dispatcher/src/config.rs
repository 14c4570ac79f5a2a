//! Dispatcher configuration snapshot.
//!
//! The configuration lives in the `system_settings` key/value table. It is
//! read once at the start of a run and never re-read, so edits made while a
//! campaign is sending only affect the next run.

use std::collections::HashMap;
use std::str::FromStr;

use tracing::warn;

use crate::error::DispatchError;

/// Default per-message delay range, in milliseconds.
pub const DEFAULT_MIN_DELAY_MS: u64 = 1_000;
pub const DEFAULT_MAX_DELAY_MS: u64 = 3_000;
/// Default batch size range.
pub const DEFAULT_BATCH_SIZE_MIN: u32 = 5;
pub const DEFAULT_BATCH_SIZE_MAX: u32 = 15;
/// Default batch pause range, in milliseconds.
pub const DEFAULT_BATCH_DELAY_MS_MIN: u64 = 30_000;
pub const DEFAULT_BATCH_DELAY_MS_MAX: u64 = 60_000;
/// Default number of successful sends between admin progress notices.
pub const DEFAULT_NOTIFICATION_INTERVAL: u32 = 50;

/// Setting keys.
pub mod keys {
    pub const API_URL: &str = "waha_api_url";
    pub const API_KEY: &str = "waha_api_key";
    pub const MIN_DELAY_MS: &str = "min_delay_ms";
    pub const MAX_DELAY_MS: &str = "max_delay_ms";
    pub const BATCH_SIZE_MIN: &str = "batch_size_min";
    pub const BATCH_SIZE_MAX: &str = "batch_size_max";
    pub const BATCH_DELAY_MS_MIN: &str = "batch_delay_ms_min";
    pub const BATCH_DELAY_MS_MAX: &str = "batch_delay_ms_max";
    pub const ADMIN_PHONE_NUMBERS: &str = "admin_phone_numbers";
    pub const NOTIFICATION_INTERVAL: &str = "notification_interval";
}

/// Pacing ranges used by the rate controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacingConfig {
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub batch_size_min: u32,
    pub batch_size_max: u32,
    pub batch_delay_ms_min: u64,
    pub batch_delay_ms_max: u64,
}

impl PacingConfig {
    /// No waiting at all. Handy for tests and dry runs.
    pub fn immediate() -> Self {
        Self {
            min_delay_ms: 0,
            max_delay_ms: 0,
            batch_size_min: DEFAULT_BATCH_SIZE_MIN,
            batch_size_max: DEFAULT_BATCH_SIZE_MAX,
            batch_delay_ms_min: 0,
            batch_delay_ms_max: 0,
        }
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: DEFAULT_MIN_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            batch_size_min: DEFAULT_BATCH_SIZE_MIN,
            batch_size_max: DEFAULT_BATCH_SIZE_MAX,
            batch_delay_ms_min: DEFAULT_BATCH_DELAY_MS_MIN,
            batch_delay_ms_max: DEFAULT_BATCH_DELAY_MS_MAX,
        }
    }
}

/// Gateway credentials, validated.
#[derive(Clone, PartialEq, Eq)]
pub struct GatewaySettings {
    pub api_url: String,
    pub api_key: String,
}

impl std::fmt::Debug for GatewaySettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewaySettings")
            .field("api_url", &self.api_url)
            .field("api_key", &"***")
            .finish()
    }
}

/// Everything a run needs from system configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchConfig {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub pacing: PacingConfig,
    pub admin_phone_numbers: Vec<String>,
    /// Successful sends between progress notices. Zero disables them.
    pub notification_interval: u32,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            api_key: None,
            pacing: PacingConfig::default(),
            admin_phone_numbers: Vec::new(),
            notification_interval: DEFAULT_NOTIFICATION_INTERVAL,
        }
    }
}

impl DispatchConfig {
    /// Build from raw settings, falling back to defaults for anything
    /// missing or unparsable.
    pub fn from_settings(settings: &HashMap<String, String>) -> Self {
        let text = |key: &str| {
            settings
                .get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let admin_phone_numbers = text(keys::ADMIN_PHONE_NUMBERS)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            api_url: text(keys::API_URL),
            api_key: text(keys::API_KEY),
            pacing: PacingConfig {
                min_delay_ms: parse_or(settings, keys::MIN_DELAY_MS, DEFAULT_MIN_DELAY_MS),
                max_delay_ms: parse_or(settings, keys::MAX_DELAY_MS, DEFAULT_MAX_DELAY_MS),
                batch_size_min: parse_or(settings, keys::BATCH_SIZE_MIN, DEFAULT_BATCH_SIZE_MIN),
                batch_size_max: parse_or(settings, keys::BATCH_SIZE_MAX, DEFAULT_BATCH_SIZE_MAX),
                batch_delay_ms_min: parse_or(
                    settings,
                    keys::BATCH_DELAY_MS_MIN,
                    DEFAULT_BATCH_DELAY_MS_MIN,
                ),
                batch_delay_ms_max: parse_or(
                    settings,
                    keys::BATCH_DELAY_MS_MAX,
                    DEFAULT_BATCH_DELAY_MS_MAX,
                ),
            },
            admin_phone_numbers,
            notification_interval: parse_or(
                settings,
                keys::NOTIFICATION_INTERVAL,
                DEFAULT_NOTIFICATION_INTERVAL,
            ),
        }
    }

    /// Gateway URL and key, or a configuration error naming what is missing.
    pub fn gateway_settings(&self) -> Result<GatewaySettings, DispatchError> {
        let api_url = self
            .api_url
            .clone()
            .ok_or_else(|| DispatchError::Configuration("gateway API URL is not configured".into()))?;
        let api_key = self
            .api_key
            .clone()
            .ok_or_else(|| DispatchError::Configuration("gateway API key is not configured".into()))?;
        Ok(GatewaySettings { api_url, api_key })
    }
}

fn parse_or<T: FromStr + Copy>(settings: &HashMap<String, String>, key: &str, default: T) -> T {
    match settings.get(key).map(|v| v.trim()).filter(|v| !v.is_empty()) {
        Some(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                warn!(key, value = raw, "Ignoring unparsable setting");
                default
            }
        },
        None => default,
    }
}
