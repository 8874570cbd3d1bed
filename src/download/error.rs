//! Error types for the fetch step.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while fetching an artifact.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The declared size exceeds the configured ceiling; nothing was requested.
    #[error("declared size {declared_bytes} bytes exceeds limit of {ceiling_bytes} bytes")]
    TooLarge {
        /// Size declared by the resolver.
        declared_bytes: u64,
        /// Configured maximum.
        ceiling_bytes: u64,
    },

    /// The origin answered with a non-2xx status.
    #[error("HTTP {status} fetching {url}")]
    BadStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// Connection, timeout, or body-read failure.
    #[error("network error fetching {url}: {source}")]
    Transport {
        /// The URL being fetched.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Creating, writing, or publishing the local file failed.
    #[error("IO error writing to {path}: {source}")]
    LocalWrite {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    /// Creates a size-policy rejection.
    #[must_use]
    pub fn too_large(declared_bytes: u64, ceiling_bytes: u64) -> Self {
        Self::TooLarge {
            declared_bytes,
            ceiling_bytes,
        }
    }

    /// Creates an HTTP status error.
    pub fn bad_status(url: impl Into<String>, status: u16) -> Self {
        Self::BadStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a transport error from a reqwest error.
    pub fn transport(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Transport {
            url: url.into(),
            source,
        }
    }

    /// Creates a local write error.
    pub fn local_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::LocalWrite {
            path: path.into(),
            source,
        }
    }
}

// No From<reqwest::Error> / From<std::io::Error>: every variant needs the url
// or path the source error lacks.
