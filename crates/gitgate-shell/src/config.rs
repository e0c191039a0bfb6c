//! Shell configuration.
//!
//! Values come from an optional TOML/YAML/JSON file, then from environment
//! variables prefixed with `GITGATE__` (for example `GITGATE__REPO_ROOT`).
//! Fields missing from both fall back to [`Config::default`].

use crate::logging::LogSink;
use gitgate_auth::{load_authorized_keys, parse_authorized_keys, AccessLevel, KeyListAccess};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "GITGATE";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file or environment could not be read or deserialized.
    #[error("failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    /// A value was read but is not usable.
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// Authorized keys could not be loaded.
    #[error("failed to load authorized keys: {0}")]
    Keys(#[from] gitgate_auth::AuthError),
}

/// Configuration for a gitgate shell session.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding all repositories.
    pub repo_root: PathBuf,
    /// OpenSSH `authorized_keys` file listing trusted keys.
    pub authorized_keys_path: Option<PathBuf>,
    /// Additional authorized keys, in `authorized_keys` format.
    pub authorized_keys: Option<String>,
    /// Access granted to listed keys.
    pub granted_access: AccessLevel,
    /// Access granted to unlisted or absent keys.
    pub anonymous_access: AccessLevel,
    /// Text written to stderr at the end of every session.
    pub banner: Option<String>,
    /// Log level.
    pub log_level: String,
    /// Log format, `pretty` or `json`.
    pub log_format: String,
    /// Log destination.
    pub log_file: Option<PathBuf>,
    /// Write logs to stderr when no `log_file` is set. The SSH client sees
    /// stderr, so this is for local debugging only.
    pub log_to_stderr: bool,
    /// Seconds after which an abandoned repository lock is broken.
    pub stale_lock_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            repo_root: PathBuf::from("./repos/"),
            authorized_keys_path: None,
            authorized_keys: None,
            granted_access: AccessLevel::ReadWrite,
            anonymous_access: AccessLevel::NoAccess,
            banner: None,
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            log_file: None,
            log_to_stderr: false,
            stale_lock_secs: 60,
        }
    }
}

impl Config {
    /// Loads configuration from `path` (if given) and the environment, then
    /// validates it.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path).required(true));
        }
        builder = builder.add_source(
            ::config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let config: Config = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values that deserialize fine but cannot work.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.repo_root.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("repo_root must not be empty".into()));
        }
        if self.stale_lock_secs == 0 {
            return Err(ConfigError::Invalid(
                "stale_lock_secs must be greater than zero".into(),
            ));
        }
        match self.log_format.to_lowercase().as_str() {
            "pretty" | "json" => {}
            other => {
                return Err(ConfigError::Invalid(format!(
                    "log_format must be pretty or json, got {other:?}"
                )))
            }
        }
        Ok(())
    }

    /// Where logs go. Nothing reaches stderr unless `log_to_stderr` is set.
    pub fn log_sink(&self) -> LogSink<'_> {
        match &self.log_file {
            Some(path) => LogSink::File(path),
            None if self.log_to_stderr => LogSink::Stderr,
            None => LogSink::Disabled,
        }
    }

    /// Age after which a repository lock is considered abandoned.
    pub fn stale_lock_age(&self) -> Duration {
        Duration::from_secs(self.stale_lock_secs)
    }

    /// Builds the access controller from the configured keys.
    pub async fn access_control(&self) -> Result<KeyListAccess, ConfigError> {
        let mut keys = match &self.authorized_keys_path {
            Some(path) => load_authorized_keys(path).await?,
            None => Vec::new(),
        };
        if let Some(inline) = &self.authorized_keys {
            keys.extend(parse_authorized_keys(inline)?);
        }

        tracing::debug!(keys = keys.len(), "loaded authorized keys");
        Ok(KeyListAccess::new(keys, self.granted_access).with_default_access(self.anonymous_access))
    }
}
