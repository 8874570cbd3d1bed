//! Relay configuration loaded once at startup from a JSON file.
//!
//! The loaded [`RelayConfig`] is passed explicitly into every component
//! constructor; nothing reads configuration from process-wide state.

use std::fs;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

use crate::download::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use crate::resolver::RESOLVER_TIMEOUT_SECS;

/// Default maximum artifact size (32 MiB).
pub const DEFAULT_MAX_FILESIZE: u64 = 32 * 1024 * 1024;

/// Default resolver format selector (best audio-only stream in an m4a container).
pub const DEFAULT_AUDIO_FORMAT: &str = "bestaudio[ext=m4a]";

const DEFAULT_LOG_LEVEL: &str = "info";

/// Module arguments used when the resolver is configured as a Python interpreter.
const PYTHON_MODULE_ARGS: [&str; 2] = ["-m", "youtube_dl"];

/// Errors raised while loading or validating the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// Path that was read.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid JSON or has wrong-typed fields.
    #[error("failed to parse config: {source}")]
    Parse {
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A field holds a value outside its accepted range.
    #[error("invalid config value for `{field}`: {reason}")]
    Invalid {
        /// Offending field name.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// On-disk shape of the config file.
///
/// `python3` is accepted in place of `resolver`; when used, the resolver is
/// run as `python3 -m youtube_dl` unless `resolver_args` overrides it.
#[derive(Debug, Deserialize)]
struct RawConfig {
    token: SecretString,
    music_dir: PathBuf,
    #[serde(default)]
    max_filesize: Option<u64>,
    #[serde(default)]
    resolver: Option<PathBuf>,
    #[serde(default)]
    python3: Option<PathBuf>,
    #[serde(default)]
    resolver_args: Option<Vec<String>>,
    #[serde(default)]
    audio_format: Option<String>,
    #[serde(default)]
    log_level: Option<String>,
    #[serde(default)]
    resolver_timeout_secs: Option<u64>,
    #[serde(default)]
    fetch_connect_timeout_secs: Option<u64>,
    #[serde(default)]
    fetch_read_timeout_secs: Option<u64>,
}

/// Validated, read-only relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Chat platform bot credential.
    pub token: SecretString,
    /// Flat directory holding fetched artifacts.
    pub music_dir: PathBuf,
    /// Largest declared artifact size that will be fetched, in bytes.
    pub max_filesize: u64,
    /// Resolver executable.
    pub resolver: PathBuf,
    /// Arguments placed before the resolver's own flags.
    pub resolver_args: Vec<String>,
    /// Format selector passed with `-f`.
    pub audio_format: String,
    /// Log verbosity label as written in the file.
    pub log_level: String,
    /// Upper bound on one resolver invocation.
    pub resolver_timeout_secs: u64,
    /// HTTP connect timeout for media fetches.
    pub fetch_connect_timeout_secs: u64,
    /// Overall HTTP timeout for one media fetch.
    pub fetch_read_timeout_secs: u64,
}

impl RelayConfig {
    /// Reads and validates the config file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file is unreadable, not valid JSON,
    /// or holds out-of-range values.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Parses and validates configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON and
    /// [`ConfigError::Invalid`] for rejected values.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig =
            serde_json::from_str(raw).map_err(|source| ConfigError::Parse { source })?;

        let (resolver, default_args) = match (raw.resolver, raw.python3) {
            (Some(resolver), _) => (resolver, Vec::new()),
            (None, Some(python)) => (
                python,
                PYTHON_MODULE_ARGS.iter().map(ToString::to_string).collect(),
            ),
            (None, None) => {
                return Err(ConfigError::invalid(
                    "resolver",
                    "either `resolver` or `python3` must be set",
                ));
            }
        };

        let config = Self {
            token: raw.token,
            music_dir: raw.music_dir,
            max_filesize: raw.max_filesize.unwrap_or(DEFAULT_MAX_FILESIZE),
            resolver,
            resolver_args: raw.resolver_args.unwrap_or(default_args),
            audio_format: raw
                .audio_format
                .unwrap_or_else(|| DEFAULT_AUDIO_FORMAT.to_string()),
            log_level: raw
                .log_level
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            resolver_timeout_secs: raw
                .resolver_timeout_secs
                .unwrap_or(RESOLVER_TIMEOUT_SECS),
            fetch_connect_timeout_secs: raw
                .fetch_connect_timeout_secs
                .unwrap_or(CONNECT_TIMEOUT_SECS),
            fetch_read_timeout_secs: raw
                .fetch_read_timeout_secs
                .unwrap_or(READ_TIMEOUT_SECS),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validates values against runtime constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first rejected field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        use secrecy::ExposeSecret;

        if self.token.expose_secret().trim().is_empty() {
            return Err(ConfigError::invalid("token", "must not be empty"));
        }
        if self.music_dir.as_os_str().is_empty() {
            return Err(ConfigError::invalid("music_dir", "must not be empty"));
        }
        if self.max_filesize == 0 {
            return Err(ConfigError::invalid("max_filesize", "must be greater than 0"));
        }
        if self.resolver.as_os_str().is_empty() {
            return Err(ConfigError::invalid("resolver", "must not be empty"));
        }
        if self.audio_format.trim().is_empty() {
            return Err(ConfigError::invalid("audio_format", "must not be empty"));
        }
        validate_timeout_secs("resolver_timeout_secs", self.resolver_timeout_secs)?;
        validate_timeout_secs("fetch_connect_timeout_secs", self.fetch_connect_timeout_secs)?;
        validate_timeout_secs("fetch_read_timeout_secs", self.fetch_read_timeout_secs)?;
        Ok(())
    }

    /// Returns the tracing filter directive for the configured log level.
    ///
    /// Unknown labels fall back to `info`; the second value reports whether
    /// the label was recognized so the caller can log the fallback.
    #[must_use]
    pub fn log_directive(&self) -> (&'static str, bool) {
        match parse_log_level(&self.log_level) {
            Some(directive) => (directive, true),
            None => (DEFAULT_LOG_LEVEL, false),
        }
    }
}

/// Maps a config log level label onto a tracing filter directive.
///
/// `fatal` has no tracing counterpart and is treated as `error`.
#[must_use]
pub fn parse_log_level(label: &str) -> Option<&'static str> {
    match label.trim().to_ascii_lowercase().as_str() {
        "debug" => Some("debug"),
        "info" => Some("info"),
        "warning" | "warn" => Some("warn"),
        "error" | "fatal" => Some("error"),
        _ => None,
    }
}

fn validate_timeout_secs(field: &'static str, value: u64) -> Result<(), ConfigError> {
    if !(1..=3600).contains(&value) {
        return Err(ConfigError::invalid(
            field,
            format!("{value}. Expected range: 1..=3600"),
        ));
    }
    Ok(())
}
