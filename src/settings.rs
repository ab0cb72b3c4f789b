//! Runtime settings from the environment (and `.env`)

use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::{DEFAULT_HISTORY_WINDOW, DEFAULT_STATE_TTL_SECS};

/// Process-level settings; the questionnaire itself is loaded separately
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub state_ttl: Duration,
    pub history_window: usize,
    /// Questionnaire file; the built-in definition when unset
    pub questionnaire_path: Option<PathBuf>,
    /// File-backed state when set, in-memory otherwise
    pub state_dir: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("{var} must be a valid {expected}, got `{value}`")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            state_ttl: Duration::from_secs(DEFAULT_STATE_TTL_SECS),
            history_window: DEFAULT_HISTORY_WINDOW,
            questionnaire_path: None,
            state_dir: None,
        }
    }
}

impl Settings {
    /// Load `.env` (if present) and read `JOURNEY_*` variables
    pub fn load() -> Result<Self, SettingsError> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    /// Read `JOURNEY_*` variables without touching `.env`
    pub fn from_env() -> Result<Self, SettingsError> {
        let defaults = Self::default();

        let port = match non_empty("JOURNEY_PORT") {
            Some(raw) => parse("JOURNEY_PORT", "port number", raw)?,
            None => defaults.port,
        };
        let state_ttl = match non_empty("JOURNEY_STATE_TTL_SECS") {
            Some(raw) => Duration::from_secs(parse("JOURNEY_STATE_TTL_SECS", "number of seconds", raw)?),
            None => defaults.state_ttl,
        };
        let history_window = match non_empty("JOURNEY_HISTORY_WINDOW") {
            Some(raw) => parse("JOURNEY_HISTORY_WINDOW", "message count", raw)?,
            None => defaults.history_window,
        };

        Ok(Self {
            host: non_empty("JOURNEY_HOST").unwrap_or(defaults.host),
            port,
            log_level: non_empty("JOURNEY_LOG_LEVEL").unwrap_or(defaults.log_level),
            state_ttl,
            history_window,
            questionnaire_path: non_empty("JOURNEY_QUESTIONNAIRE").map(PathBuf::from),
            state_dir: non_empty("JOURNEY_STATE_DIR").map(PathBuf::from),
        })
    }

    /// "host:port" for binding the HTTP server
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn non_empty(var: &str) -> Option<String> {
    env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse<T: std::str::FromStr>(var: &'static str, expected: &'static str, raw: String) -> Result<T, SettingsError> {
    raw.parse().map_err(|_| SettingsError::Invalid {
        var,
        expected,
        value: raw,
    })
}
