//! Client configuration
//!
//! Values come from the environment (a `.env` file is loaded by the binary).

use crate::error::ClientError;
use crate::Result;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_TOKEN_FILE: &str = ".budget_token";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Root of the budget API, without the `/api` prefix.
    pub base_url: String,
    /// Whole-request timeout. `None` keeps the transport default.
    pub timeout: Option<Duration>,
    /// Where the CLI keeps the bearer token between invocations.
    pub token_file: PathBuf,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: normalize_base_url(&base_url.into()),
            timeout: None,
            token_file: PathBuf::from(DEFAULT_TOKEN_FILE),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_token_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_file = path.into();
        self
    }

    /// Read `BUDGET_API_URL` (or `API_URL`), `BUDGET_API_TIMEOUT_SECS` and `BUDGET_TOKEN_FILE`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env`, reading values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup("BUDGET_API_URL")
            .or_else(|| lookup("API_URL"))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let timeout = match lookup("BUDGET_API_TIMEOUT_SECS") {
            Some(raw) => Some(parse_timeout(&raw)?),
            None => None,
        };

        let token_file = lookup("BUDGET_TOKEN_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TOKEN_FILE));

        let trimmed = base_url.trim();
        if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
            return Err(ClientError::Config(format!(
                "BUDGET_API_URL must be an http(s) URL, got '{}'",
                base_url
            )));
        }

        Ok(Self {
            base_url: normalize_base_url(trimmed),
            timeout,
            token_file,
        })
    }

    /// Join an absolute API path (e.g. `/api/budget/`) onto the base URL.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

fn parse_timeout(raw: &str) -> Result<Duration> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ClientError::Config(format!(
            "BUDGET_API_TIMEOUT_SECS must be a positive integer, got '{}'",
            raw
        ))),
    }
}
