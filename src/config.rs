use std::env;
use std::time::Duration;

use dotenv::dotenv;
use reqwest::Url;
use tracing::{info, warn};

pub const API_URL_ENV_VAR: &str = "SUSTAINABITE_API_URL";
pub const TIMEOUT_ENV_VAR: &str = "SUSTAINABITE_TIMEOUT_SECS";

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: normalize_base_url(&base_url.into()),
            timeout,
        }
    }

    /// Reads the `.env` file (if any) and the process environment.
    pub fn from_env() -> Self {
        dotenv().ok();
        Self::load(|key| env::var(key).ok())
    }

    /// Builds the config from `lookup`; missing or unusable values fall back
    /// to the defaults.
    pub fn load(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let base_url = try_load(&lookup, API_URL_ENV_VAR, DEFAULT_API_URL, parse_base_url);
        let timeout_secs = try_load(
            &lookup,
            TIMEOUT_ENV_VAR,
            DEFAULT_TIMEOUT_SECS,
            parse_timeout_secs,
        );
        Self {
            base_url,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// Applies command-line overrides on top of the environment values.
    /// Unusable overrides are ignored with a warning.
    pub fn with_overrides(mut self, base_url: Option<&str>, timeout_secs: Option<u64>) -> Self {
        if let Some(url) = base_url {
            match parse_base_url(url) {
                Ok(url) => self.base_url = url,
                Err(e) => warn!("Ignoring --base-url: {e}"),
            }
        }
        match timeout_secs {
            Some(0) => warn!("Ignoring --timeout-secs 0: timeout must be at least 1 second"),
            Some(secs) => self.timeout = Duration::from_secs(secs),
            None => {}
        }
        self
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

/// Accepts absolute `http`/`https` URLs with a host; returns them without a
/// trailing slash. Also used as the clap parser for `--base-url`.
pub fn parse_base_url(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim();
    let url = Url::parse(trimmed).map_err(|e| format!("invalid base URL '{trimmed}': {e}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!(
            "invalid base URL '{trimmed}': scheme must be http or https"
        ));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(format!("invalid base URL '{trimmed}': missing host"));
    }
    Ok(normalize_base_url(trimmed))
}

fn parse_timeout_secs(raw: &str) -> Result<u64, String> {
    match raw.trim().parse::<u64>() {
        Ok(0) => Err("timeout must be at least 1 second".to_string()),
        Ok(secs) => Ok(secs),
        Err(e) => Err(e.to_string()),
    }
}

fn try_load<T, D, P>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: D, parse: P) -> T
where
    D: Into<T> + std::fmt::Display + Copy,
    P: Fn(&str) -> Result<T, String>,
{
    let Some(raw) = lookup(key) else {
        info!("{key} not set, using default: {default}");
        return default.into();
    };

    parse(&raw).unwrap_or_else(|e| {
        warn!("Invalid {key} value '{raw}': {e}; using default: {default}");
        default.into()
    })
}
