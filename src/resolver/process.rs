//! Resolver backed by a `youtube-dl` compatible subprocess.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, instrument};

use super::descriptor::{MediaDescriptor, decode_record};
use super::error::ResolutionError;
use super::MetadataResolver;
use crate::config::{DEFAULT_AUDIO_FORMAT, RelayConfig};
use crate::parser::MediaReference;

/// Default upper bound on one resolver invocation (2 minutes).
pub const RESOLVER_TIMEOUT_SECS: u64 = 120;

/// Runs `<program> [args...] --dump-json -f <format> -s <reference>` and
/// decodes the single JSON record it prints.
///
/// The child gets a closed stdin and is killed if the resolve future is
/// dropped or its deadline passes.
#[derive(Debug, Clone)]
pub struct ProcessResolver {
    program: PathBuf,
    leading_args: Vec<String>,
    audio_format: String,
    timeout: Duration,
}

impl ProcessResolver {
    /// Creates a resolver running `program` with the default format and deadline.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
            audio_format: DEFAULT_AUDIO_FORMAT.to_string(),
            timeout: Duration::from_secs(RESOLVER_TIMEOUT_SECS),
        }
    }

    /// Creates a resolver from the relay configuration.
    #[must_use]
    pub fn from_config(config: &RelayConfig) -> Self {
        Self::new(&config.resolver)
            .with_leading_args(config.resolver_args.clone())
            .with_audio_format(&config.audio_format)
            .with_timeout(Duration::from_secs(config.resolver_timeout_secs))
    }

    /// Sets arguments placed before the resolver flags (e.g. `-m youtube_dl`).
    #[must_use]
    pub fn with_leading_args(mut self, args: Vec<String>) -> Self {
        self.leading_args = args;
        self
    }

    /// Sets the `-f` format selector.
    #[must_use]
    pub fn with_audio_format(mut self, format: &str) -> Self {
        self.audio_format = format.to_string();
        self
    }

    /// Sets the deadline for one invocation.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn command_args(&self, reference: &MediaReference) -> Vec<String> {
        let mut args = self.leading_args.clone();
        args.extend([
            "--dump-json".to_string(),
            "-f".to_string(),
            self.audio_format.clone(),
            "-s".to_string(),
            reference.as_str().to_string(),
        ]);
        args
    }
}

#[async_trait]
impl MetadataResolver for ProcessResolver {
    #[instrument(skip(self), fields(reference = %reference))]
    async fn resolve(
        &self,
        reference: &MediaReference,
    ) -> Result<MediaDescriptor, ResolutionError> {
        let mut command = Command::new(&self.program);
        command
            .args(self.command_args(reference))
            .stdin(Stdio::null())
            .kill_on_drop(true);

        debug!(program = %self.program.display(), "invoking resolver");
        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(ResolutionError::spawn_failed(reference.as_str(), e)),
            Err(_) => return Err(ResolutionError::timed_out(reference.as_str(), self.timeout)),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ResolutionError::exited(
                reference.as_str(),
                output.status,
                &stderr,
            ));
        }

        let descriptor = decode_record(reference.as_str(), &output.stdout)?;
        debug!(
            id = %descriptor.id,
            ext = %descriptor.extension,
            declared_size = descriptor.declared_size_bytes,
            "resolver produced descriptor"
        );
        Ok(descriptor)
    }
}
