//! Process settings read from environment-style lookups.
//!
//! # Responsibility
//! - Collect every tunable the pipeline and server need into one value.
//! - Reject malformed values up front instead of guessing.
//!
//! # Invariants
//! - `Settings` is built once at startup and passed down explicitly.
//! - An unset variable always maps to its documented default.

use crate::extension::walker::DEFAULT_EXCLUDE_MARKER;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_MODE: &str = "QUICKQL_ENV";
pub const ENV_PORT: &str = "PORT";
pub const ENV_HOST: &str = "HOST";
pub const ENV_PLAYGROUND: &str = "PLAYGROUND";
pub const ENV_INTROSPECTION: &str = "INTROSPECTION";
pub const ENV_DEBUG: &str = "DEBUG";
pub const ENV_LOG_LEVEL: &str = "QUICKQL_LOG";
pub const ENV_LOG_DIR: &str = "QUICKQL_LOG_DIR";
pub const ENV_DATA: &str = "QUICKQL_DATA";
pub const ENV_EXCLUDE: &str = "QUICKQL_EXCLUDE";

pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Runtime mode; production suppresses debug events and error detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuntimeMode {
    Production,
    #[default]
    Development,
}

impl RuntimeMode {
    /// `production` selects production; anything else is development.
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("production") {
            Self::Production
        } else {
            Self::Development
        }
    }

    pub fn is_production(self) -> bool {
        self == Self::Production
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Development => "development",
        }
    }

    pub fn default_log_level(self) -> &'static str {
        match self {
            Self::Production => "info",
            Self::Development => "debug",
        }
    }

    /// Clamps `level` so production never emits debug or trace events.
    pub fn cap_level(self, level: &'static str) -> &'static str {
        match (self, level) {
            (Self::Production, "debug" | "trace") => "info",
            _ => level,
        }
    }
}

/// Options consumed by the server bootstrap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerOptions {
    pub playground: bool,
    pub introspection: bool,
    pub debug: bool,
    pub host: String,
    pub port: u16,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            playground: true,
            introspection: true,
            debug: false,
            host: DEFAULT_HOST.to_string(),
            port: 0,
        }
    }
}

/// All process settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub mode: RuntimeMode,
    pub server: ServerOptions,
    pub log_level: String,
    pub log_dir: Option<PathBuf>,
    /// SQLite file backing the record store; in-memory when unset.
    pub data_path: Option<PathBuf>,
    pub exclude_marker: String,
    /// Directory relative roots resolve against.
    pub base_dir: PathBuf,
}

impl Settings {
    /// Reads settings from the process environment and working directory.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_dir = std::env::current_dir().map_err(ConfigError::WorkingDir)?;
        Self::from_lookup(|key| std::env::var(key).ok(), base_dir)
    }

    /// Reads settings through `lookup`, resolving paths against `base_dir`.
    pub fn from_lookup<F>(lookup: F, base_dir: impl Into<PathBuf>) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_dir = base_dir.into();
        let value = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let mode = value(ENV_MODE)
            .map(|raw| RuntimeMode::parse(&raw))
            .unwrap_or_default();

        let defaults = ServerOptions::default();
        let server = ServerOptions {
            playground: parse_flag(ENV_PLAYGROUND, lookup(ENV_PLAYGROUND), defaults.playground)?,
            introspection: parse_flag(
                ENV_INTROSPECTION,
                lookup(ENV_INTROSPECTION),
                defaults.introspection,
            )?,
            debug: parse_flag(ENV_DEBUG, lookup(ENV_DEBUG), defaults.debug)?,
            host: value(ENV_HOST).unwrap_or(defaults.host),
            port: match value(ENV_PORT) {
                Some(raw) => parse_port(&raw)?,
                None => defaults.port,
            },
        };

        let log_level = match value(ENV_LOG_LEVEL) {
            Some(raw) => mode.cap_level(normalize_level(&raw)?).to_string(),
            None => mode.default_log_level().to_string(),
        };

        let resolve = |raw: String| {
            let path = PathBuf::from(raw.trim());
            if path.is_absolute() {
                path
            } else {
                base_dir.join(path)
            }
        };

        let log_dir = value(ENV_LOG_DIR).map(resolve);
        let data_path = value(ENV_DATA).map(resolve);

        Ok(Self {
            mode,
            server,
            log_level,
            log_dir,
            data_path,
            exclude_marker: lookup(ENV_EXCLUDE).unwrap_or_else(|| DEFAULT_EXCLUDE_MARKER.to_string()),
            base_dir,
        })
    }
}

/// Parses an env-style boolean; unset uses `default`, empty means false.
pub fn parse_flag(key: &str, raw: Option<String>, default: bool) -> Result<bool, ConfigError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            key: key.to_string(),
            value: raw,
        }),
    }
}

fn parse_port(raw: &str) -> Result<u16, ConfigError> {
    raw.trim()
        .parse::<u16>()
        .map_err(|_| ConfigError::InvalidPort(raw.to_string()))
}

/// Maps a level name to the canonical `log` spelling.
pub fn normalize_level(level: &str) -> Result<&'static str, ConfigError> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        "off" => Ok("off"),
        _ => Err(ConfigError::InvalidLevel(level.to_string())),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidBool { key: String, value: String },
    InvalidPort(String),
    InvalidLevel(String),
    WorkingDir(std::io::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidBool { key, value } => write!(
                f,
                "`{key}` must be a boolean (1/0, true/false, yes/no, on/off), got `{value}`"
            ),
            Self::InvalidPort(value) => write!(f, "`{ENV_PORT}` must be a port number, got `{value}`"),
            Self::InvalidLevel(value) => write!(
                f,
                "unsupported log level `{value}`; expected trace|debug|info|warn|error|off"
            ),
            Self::WorkingDir(err) => write!(f, "cannot read working directory: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::WorkingDir(err) => Some(err),
            _ => None,
        }
    }
}
