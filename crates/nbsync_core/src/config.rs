//! Configuration loading: connection target resolution and retry settings.

use crate::constants::{
    DEFAULT_CONNECT_RETRIES, DEFAULT_HOST, DEFAULT_PASSWORD, DEFAULT_PORT,
    DEFAULT_RETRY_INTERVAL_MS, ENV_CONNECTION_INFO, ENV_HOST, ENV_PASSWORD, ENV_PORT,
};
use crate::error::ConfigError;
use serde::de::value::{Error as ValueError, MapDeserializer};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Runtime settings for the connection manager.
#[derive(Debug, Clone)]
pub struct Config {
    pub retry_interval_ms: u64,
    pub max_retries: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            retry_interval_ms: DEFAULT_RETRY_INTERVAL_MS,
            max_retries: DEFAULT_CONNECT_RETRIES,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Returns
    /// A populated [`Config`] with defaults applied when env vars are missing.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            retry_interval_ms: env::var("NBSYNC_RETRY_INTERVAL_MS")
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.retry_interval_ms),
            max_retries: env::var("NBSYNC_CONNECT_RETRIES")
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.max_retries),
        }
    }

    /// Pause between refused connection attempts.
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }
}

/// Parse a boolean-like environment flag value.
///
/// # Supported Values
/// - Truthy: `1`, `true`, `yes`, `on`
/// - Falsy: `0`, `false`, `no`, `off`, empty string
///
/// Matching is case-insensitive and ignores surrounding whitespace.
///
/// # Returns
/// `Some(bool)` when the value is recognized, otherwise `None`.
pub fn parse_env_flag(value: &str) -> Option<bool> {
    let normalized = value.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "" | "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Where to connect and which token to authenticate with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectTarget {
    pub host: String,
    pub port: u16,
    pub password: String,
}

#[derive(Debug, Default)]
struct PartialTarget {
    host: Option<String>,
    port: Option<String>,
    password: Option<String>,
}

impl PartialTarget {
    fn fill_missing_from(&mut self, lookup: &dyn Fn(&str) -> Option<String>) {
        if self.host.as_deref().map_or(true, str::is_empty) {
            self.host = lookup(ENV_HOST);
        }
        if self.port.is_none() {
            self.port = lookup(ENV_PORT);
        }
        if self.password.is_none() {
            self.password = lookup(ENV_PASSWORD);
        }
    }

    fn finish(self) -> Result<ConnectTarget, ConfigError> {
        fn or_default(value: Option<String>, default: &str) -> String {
            match value {
                Some(v) if !v.is_empty() => v,
                _ => default.to_string(),
            }
        }
        let port_text = or_default(self.port, &DEFAULT_PORT.to_string());
        let port = port_text
            .trim()
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort(port_text.clone()))?;
        Ok(ConnectTarget {
            host: or_default(self.host, DEFAULT_HOST),
            port,
            password: or_default(self.password, DEFAULT_PASSWORD),
        })
    }
}

impl ConnectTarget {
    /// Resolve the target from start parameters and the process environment.
    ///
    /// See [`ConnectTarget::resolve_with`] for the accepted forms.
    pub fn resolve(params: &str) -> Result<Self, ConfigError> {
        Self::resolve_with(params, &|key| env::var(key).ok())
    }

    /// Resolve the target using a custom environment lookup.
    ///
    /// # Arguments
    /// - `params`: `=<file>` reads an info file, `:<host>:<port>:<password>`
    ///   supplies values directly (trailing parts may be omitted), and an empty
    ///   string reads the info file named by `__NETBEANS_CONINFO`.
    /// - `lookup`: environment accessor, consulted for values still missing.
    ///
    /// # Returns
    /// A complete target; anything still missing falls back to the defaults.
    ///
    /// # Errors
    /// Returns [`ConfigError`] when the info file cannot be read or has an
    /// unsafe access mode, or when the port is not a number.
    pub fn resolve_with(
        params: &str,
        lookup: &dyn Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut partial = if let Some(file) = params.strip_prefix('=') {
            read_info_file(Path::new(file))?
        } else if let Some(arg) = params.strip_prefix(':') {
            let mut parts = arg.splitn(3, ':');
            PartialTarget {
                host: parts.next().map(str::to_string),
                port: parts.next().map(str::to_string),
                password: parts.next().map(str::to_string),
            }
        } else if let Some(file) = lookup(ENV_CONNECTION_INFO) {
            read_info_file(Path::new(&file))?
        } else {
            PartialTarget::default()
        };
        partial.fill_missing_from(lookup);
        partial.finish()
    }

    /// `host:port` form used for logging and socket address resolution.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn read_info_file(path: &Path) -> Result<PartialTarget, ConfigError> {
    check_info_file_mode(path)?;
    let content = fs::read_to_string(path).map_err(|source| ConfigError::InfoFile {
        path: path.to_path_buf(),
        source,
    })?;

    // Later lines override earlier ones.
    let entries: HashMap<String, String> = content
        .lines()
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
    let info = InfoFile::deserialize(MapDeserializer::<_, ValueError>::new(entries.into_iter()))
        .map_err(|err| ConfigError::InfoFileFormat {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
    Ok(info.into())
}

/// `key=value` lines of a connection info file; unknown keys are ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct InfoFile {
    host: String,
    port: String,
    auth: String,
}

impl From<InfoFile> for PartialTarget {
    fn from(info: InfoFile) -> Self {
        let present = |value: String| Some(value).filter(|v| !v.is_empty());
        Self {
            host: present(info.host),
            port: present(info.port),
            password: present(info.auth),
        }
    }
}

#[cfg(unix)]
fn check_info_file_mode(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;

    // Group or other access bits reject the file.
    if let Ok(meta) = fs::metadata(path) {
        if meta.permissions().mode() & 0o077 != 0 {
            return Err(ConfigError::InfoFileMode(path.to_path_buf()));
        }
    }
    Ok(())
}

#[cfg(not(unix))]
fn check_info_file_mode(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}
