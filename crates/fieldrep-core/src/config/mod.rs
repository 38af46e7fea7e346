//! Application configuration.
//!
//! Values are layered: built-in defaults, then an optional JSON file, then
//! `FIELDREP_*` environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::sync::DEFAULT_MAX_RETRIES;
use crate::util::{is_http_url, normalize_text_option};
use crate::{Error, Result};

pub const ENV_DB_PATH: &str = "FIELDREP_DB_PATH";
pub const ENV_REMOTE_URL: &str = "FIELDREP_REMOTE_URL";
pub const ENV_REMOTE_TOKEN: &str = "FIELDREP_REMOTE_TOKEN";
pub const ENV_REMOTE_TIMEOUT_SECS: &str = "FIELDREP_REMOTE_TIMEOUT_SECS";
pub const ENV_MAX_SYNC_RETRIES: &str = "FIELDREP_MAX_SYNC_RETRIES";

const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 10;

/// Runtime configuration shared by every client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Record database location; clients pick a platform default when unset
    #[serde(default)]
    pub db_path: Option<PathBuf>,
    /// Root of the remote document API; sync stays local-only when unset
    #[serde(default)]
    pub remote_base_url: Option<String>,
    #[serde(default)]
    pub remote_auth_token: Option<String>,
    #[serde(default = "default_remote_timeout_secs")]
    pub remote_timeout_secs: u64,
    /// Failed attempts before a queued task is dropped
    #[serde(default = "default_max_sync_retries")]
    pub max_sync_retries: u32,
}

const fn default_remote_timeout_secs() -> u64 {
    DEFAULT_REMOTE_TIMEOUT_SECS
}

const fn default_max_sync_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            remote_base_url: None,
            remote_auth_token: None,
            remote_timeout_secs: DEFAULT_REMOTE_TIMEOUT_SECS,
            max_sync_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl std::fmt::Display for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "db_path: {}",
            self.db_path
                .as_ref()
                .map_or_else(|| "(default)".into(), |path| path.display().to_string())
        )?;
        writeln!(
            f,
            "remote_base_url: {}",
            self.remote_base_url.as_deref().unwrap_or("(none)")
        )?;
        writeln!(
            f,
            "remote_auth_token: {}",
            if self.remote_auth_token.is_some() {
                "[REDACTED]"
            } else {
                "(none)"
            }
        )?;
        writeln!(f, "remote_timeout_secs: {}", self.remote_timeout_secs)?;
        write!(f, "max_sync_retries: {}", self.max_sync_retries)
    }
}

impl AppConfig {
    /// Parse a JSON config document
    pub fn from_json(payload: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(payload)
            .map_err(|error| Error::InvalidInput(format!("invalid config file: {error}")))?;
        config.normalized()
    }

    /// Load the config file at `path`, or defaults when it does not exist
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config file at {}", path.display());
            return Ok(Self::default());
        }
        let payload = std::fs::read_to_string(path)?;
        Self::from_json(&payload)
    }

    /// Overlay values found through `lookup` (normally the process environment)
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(db_path) = normalize_text_option(lookup(ENV_DB_PATH)) {
            self.db_path = Some(PathBuf::from(db_path));
        }
        if let Some(url) = normalize_text_option(lookup(ENV_REMOTE_URL)) {
            self.remote_base_url = Some(url);
        }
        if let Some(token) = normalize_text_option(lookup(ENV_REMOTE_TOKEN)) {
            self.remote_auth_token = Some(token);
        }
        if let Some(raw) = normalize_text_option(lookup(ENV_REMOTE_TIMEOUT_SECS)) {
            self.remote_timeout_secs = parse_number(ENV_REMOTE_TIMEOUT_SECS, &raw)?;
        }
        if let Some(raw) = normalize_text_option(lookup(ENV_MAX_SYNC_RETRIES)) {
            self.max_sync_retries = parse_number(ENV_MAX_SYNC_RETRIES, &raw)?;
        }
        self.normalized()
    }

    /// Overlay the process environment
    pub fn with_env(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    pub const fn remote_timeout(&self) -> Duration {
        Duration::from_secs(self.remote_timeout_secs)
    }

    fn normalized(mut self) -> Result<Self> {
        self.remote_auth_token = normalize_text_option(self.remote_auth_token);
        self.remote_base_url = match normalize_text_option(self.remote_base_url) {
            Some(url) if is_http_url(&url) => Some(url.trim_end_matches('/').to_string()),
            Some(_) => {
                return Err(Error::InvalidInput(
                    "remote_base_url must include http:// or https://".to_string(),
                ))
            }
            None => None,
        };
        if self.max_sync_retries == 0 {
            return Err(Error::InvalidInput(
                "max_sync_retries must be at least 1".to_string(),
            ));
        }
        if self.remote_timeout_secs == 0 {
            return Err(Error::InvalidInput(
                "remote_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(self)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.parse()
        .map_err(|_| Error::InvalidInput(format!("{key} must be a number, got '{raw}'")))
}
