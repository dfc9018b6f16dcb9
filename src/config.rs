use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_RELAY_URL: &str = "http://localhost:54321/functions/v1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

pub const RELAY_URL_VAR: &str = "PARKING_ASSISTANT_RELAY_URL";
pub const API_KEY_VAR: &str = "PARKING_ASSISTANT_API_KEY";
pub const DATA_DIR_VAR: &str = "PARKING_ASSISTANT_DATA_DIR";
pub const TIMEOUT_VAR: &str = "PARKING_ASSISTANT_TIMEOUT_SECS";
pub const LOG_VAR: &str = "PARKING_ASSISTANT_LOG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be a whole number of seconds, got {value:?}")]
    InvalidTimeout { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub relay_url: String,
    /// Bearer token for the relay (a public anon key, never a provider key).
    pub api_key: Option<String>,
    /// Overrides the default storage directory when set.
    pub data_dir: Option<PathBuf>,
    pub timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            relay_url: DEFAULT_RELAY_URL.to_string(),
            api_key: None,
            data_dir: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl Config {
    /// Load `.env` if present, then read settings from the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_env()
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let timeout = match get(TIMEOUT_VAR) {
            Some(value) => {
                let secs = value.parse::<u64>().map_err(|_| ConfigError::InvalidTimeout {
                    var: TIMEOUT_VAR,
                    value: value.clone(),
                })?;
                Duration::from_secs(secs)
            }
            None => defaults.timeout,
        };

        Ok(Self {
            relay_url: get(RELAY_URL_VAR).unwrap_or(defaults.relay_url),
            api_key: get(API_KEY_VAR),
            data_dir: get(DATA_DIR_VAR).map(PathBuf::from),
            timeout,
        })
    }
}
