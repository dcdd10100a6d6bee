//! Connection configuration for a single Airtable base.

use std::fmt;
use std::time::Duration;

use crate::error::AirtableError;

pub const DEFAULT_API_ROOT: &str = "https://api.airtable.com/v0";

pub const ENV_API_KEY: &str = "AIRTABLE_API_KEY";
pub const ENV_BASE_ID: &str = "AIRTABLE_BASE_ID";
pub const ENV_API_ROOT: &str = "AIRTABLE_API_ROOT";
pub const ENV_TIMEOUT_MS: &str = "AIRTABLE_TIMEOUT_MS";

/// Base id, API key and transport settings. Immutable once a client owns it.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    base_id: String,
    api_key: String,
    timeout: Option<Duration>,
    api_root: String,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_id", &self.base_id)
            .field("api_key", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .field("api_root", &self.api_root)
            .finish()
    }
}

impl ClientConfig {
    pub fn new(base_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_id: base_id.into(),
            api_key: api_key.into(),
            timeout: None,
            api_root: DEFAULT_API_ROOT.to_string(),
        }
    }

    /// Load from the environment.
    ///
    /// `AIRTABLE_API_KEY` and `AIRTABLE_BASE_ID` are required;
    /// `AIRTABLE_API_ROOT` and `AIRTABLE_TIMEOUT_MS` are optional.
    pub fn from_env() -> Result<Self, AirtableError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AirtableError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| AirtableError::Config(format!("{key} is not set")))
        };
        let mut config = Self::new(require(ENV_BASE_ID)?, require(ENV_API_KEY)?);

        if let Some(root) = lookup(ENV_API_ROOT).filter(|v| !v.trim().is_empty()) {
            config = config.with_api_root(root);
        }
        if let Some(ms) = lookup(ENV_TIMEOUT_MS) {
            let ms: u64 = ms.trim().parse().map_err(|_| {
                AirtableError::Config(format!("{ENV_TIMEOUT_MS} must be milliseconds, got {ms:?}"))
            })?;
            config = config.with_timeout(Duration::from_millis(ms));
        }
        Ok(config)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Point the client at another server, e.g. a local mock.
    pub fn with_api_root(mut self, api_root: impl Into<String>) -> Self {
        self.api_root = api_root.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_id(&self) -> &str {
        &self.base_id
    }

    pub(crate) fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn api_root(&self) -> &str {
        &self.api_root
    }
}
