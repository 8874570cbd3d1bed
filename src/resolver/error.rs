//! Error types for resolver operations.

use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;

/// Longest stderr excerpt kept in a [`ResolutionError::ProcessFailed`] reason.
const MAX_STDERR_CHARS: usize = 2000;

/// Errors that can occur while resolving a reference into a media descriptor.
#[derive(Debug, Error)]
pub enum ResolutionError {
    /// The resolver could not be started, timed out, or exited unsuccessfully.
    #[error("resolver process failed for '{reference}': {reason}")]
    ProcessFailed {
        /// The reference being resolved.
        reference: String,
        /// Exit status, timeout, or spawn failure, with captured stderr.
        reason: String,
        /// Spawn error when the process never started.
        #[source]
        source: Option<std::io::Error>,
    },

    /// The resolver output is not the expected record shape.
    #[error("resolver output is malformed: {reason}")]
    MalformedOutput {
        /// What was wrong with the output.
        reason: String,
    },

    /// The record parsed but carries no fetchable media URL.
    #[error("resolver returned no media URL for '{reference}'")]
    NoMedia {
        /// The reference being resolved.
        reference: String,
    },
}

impl ResolutionError {
    /// Creates a `ProcessFailed` error for a resolver that could not be spawned.
    #[must_use]
    pub fn spawn_failed(reference: &str, source: std::io::Error) -> Self {
        Self::ProcessFailed {
            reference: reference.to_string(),
            reason: format!("could not start resolver: {source}"),
            source: Some(source),
        }
    }

    /// Creates a `ProcessFailed` error for a non-zero exit.
    #[must_use]
    pub fn exited(reference: &str, status: ExitStatus, stderr: &str) -> Self {
        let stderr = stderr.trim();
        let reason = if stderr.is_empty() {
            format!("{status}")
        } else {
            let excerpt: String = stderr.chars().take(MAX_STDERR_CHARS).collect();
            format!("{status}: {excerpt}")
        };
        Self::ProcessFailed {
            reference: reference.to_string(),
            reason,
            source: None,
        }
    }

    /// Creates a `ProcessFailed` error for a resolver killed after its deadline.
    #[must_use]
    pub fn timed_out(reference: &str, limit: Duration) -> Self {
        Self::ProcessFailed {
            reference: reference.to_string(),
            reason: format!("no result within {}s", limit.as_secs()),
            source: None,
        }
    }

    /// Creates a `MalformedOutput` error.
    #[must_use]
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedOutput {
            reason: reason.into(),
        }
    }

    /// Creates a `NoMedia` error.
    #[must_use]
    pub fn no_media(reference: &str) -> Self {
        Self::NoMedia {
            reference: reference.to_string(),
        }
    }
}
