//! Connection settings: load from YAML, layer overrides, validate.
//!
//! Settings live at `~/.p4watch/config.yaml` by default. Every field is
//! optional on disk so that command-line flags can fill the gaps; the
//! required ones are enforced by [`P4Settings::validate`].

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default append-only diagnostic log.
pub const DEFAULT_LOG_PATH: &str = "/tmp/p4watch.log";

/// Default client executable, resolved through `$PATH`.
pub const DEFAULT_P4_BINARY: &str = "p4";

/// Raw, possibly incomplete settings as read from disk or flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct P4Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Depot subtree to watch, e.g. `//depot/project/...`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depot_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interactive: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p4_binary: Option<PathBuf>,
}

/// Validated connection settings.
#[derive(Clone, PartialEq, Eq)]
pub struct P4Config {
    pub port: String,
    pub client: String,
    pub user: String,
    pub password: String,
    pub depot_path: String,
    pub interactive: bool,
    pub log_path: PathBuf,
    pub timeout: Option<Duration>,
    pub p4_binary: PathBuf,
}

impl fmt::Debug for P4Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("P4Config")
            .field("port", &self.port)
            .field("client", &self.client)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("depot_path", &self.depot_path)
            .field("interactive", &self.interactive)
            .field("log_path", &self.log_path)
            .field("timeout", &self.timeout)
            .field("p4_binary", &self.p4_binary)
            .finish()
    }
}

/// `~/.p4watch/config.yaml`
pub fn default_path() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
    Ok(default_path_at(&home))
}

/// Settings path rooted at an explicit home directory.
pub fn default_path_at(home: &Path) -> PathBuf {
    home.join(".p4watch").join("config.yaml")
}

impl P4Settings {
    /// Load settings from `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load settings from `path`, treating a missing file as empty settings.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        match Self::load(path) {
            Err(ConfigError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Layer `overrides` on top of `self`; any value set in `overrides` wins.
    pub fn merge(self, overrides: P4Settings) -> P4Settings {
        P4Settings {
            port: overrides.port.or(self.port),
            client: overrides.client.or(self.client),
            user: overrides.user.or(self.user),
            password: overrides.password.or(self.password),
            depot_path: overrides.depot_path.or(self.depot_path),
            interactive: overrides.interactive.or(self.interactive),
            log_path: overrides.log_path.or(self.log_path),
            timeout_secs: overrides.timeout_secs.or(self.timeout_secs),
            p4_binary: overrides.p4_binary.or(self.p4_binary),
        }
    }

    /// Check required values and fill defaults.
    ///
    /// Reports the first absent field in the order client, port, user,
    /// password, depot_path. Empty strings count as absent.
    pub fn validate(self) -> Result<P4Config, ConfigError> {
        let client = require(self.client, "client")?;
        let port = require(self.port, "port")?;
        let user = require(self.user, "user")?;
        let password = require(self.password, "password")?;
        let depot_path = require(self.depot_path, "depot_path")?;

        Ok(P4Config {
            port,
            client,
            user,
            password,
            depot_path,
            interactive: self.interactive.unwrap_or(false),
            log_path: self
                .log_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_PATH)),
            timeout: self.timeout_secs.map(Duration::from_secs),
            p4_binary: self
                .p4_binary
                .unwrap_or_else(|| PathBuf::from(DEFAULT_P4_BINARY)),
        })
    }
}

fn require(value: Option<String>, field: &'static str) -> Result<String, ConfigError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::MissingField { field }),
    }
}
