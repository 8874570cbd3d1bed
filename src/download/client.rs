//! HTTP fetcher streaming resolved media to the artifact store.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument, warn};

use super::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use super::error::FetchError;
use crate::resolver::MediaDescriptor;
use crate::user_agent;

/// Rejects descriptors whose declared size exceeds `size_ceiling`.
///
/// Only the declared size is checked; the transferred size is not policed.
///
/// # Errors
///
/// Returns [`FetchError::TooLarge`] when `declared_size_bytes > size_ceiling`.
pub fn check_size_policy(
    descriptor: &MediaDescriptor,
    size_ceiling: u64,
) -> Result<(), FetchError> {
    if descriptor.declared_size_bytes > size_ceiling {
        return Err(FetchError::too_large(
            descriptor.declared_size_bytes,
            size_ceiling,
        ));
    }
    Ok(())
}

/// HTTP client for fetching artifacts, created once and shared by all runs.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    /// Creates a fetcher with the default timeouts.
    ///
    /// # Errors
    ///
    /// Returns the reqwest error if the HTTP client cannot be built.
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_timeouts(CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
    }

    /// Creates a fetcher with explicit timeout values.
    ///
    /// # Errors
    ///
    /// Returns the reqwest error if the HTTP client cannot be built.
    pub fn with_timeouts(
        connect_timeout_secs: u64,
        read_timeout_secs: u64,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .timeout(Duration::from_secs(read_timeout_secs))
            .gzip(true)
            .user_agent(user_agent::default_fetch_user_agent())
            .build()?;
        Ok(Self { client })
    }

    /// Fetches `descriptor.source_url` into `destination`.
    ///
    /// The size policy is applied before any network activity. The body is
    /// streamed into a hidden staging file next to `destination` and renamed
    /// onto it only after the whole body is flushed, so a failed fetch never
    /// leaves a file under the artifact name. Returns the bytes written.
    ///
    /// # Errors
    ///
    /// - [`FetchError::TooLarge`] when the declared size exceeds `size_ceiling`
    /// - [`FetchError::BadStatus`] for non-2xx responses
    /// - [`FetchError::Transport`] for connection, timeout, or body-read failures
    /// - [`FetchError::LocalWrite`] for file create/write/rename failures
    #[instrument(
        skip(self, descriptor),
        fields(id = %descriptor.id, destination = %destination.display())
    )]
    pub async fn fetch(
        &self,
        descriptor: &MediaDescriptor,
        destination: &Path,
        size_ceiling: u64,
    ) -> Result<u64, FetchError> {
        check_size_policy(descriptor, size_ceiling)?;

        let url = descriptor.source_url.as_str();
        debug!(declared = descriptor.declared_size_bytes, "starting fetch");

        let response = self
            .client
            .get(url)
            .headers(build_headers(&descriptor.fetch_headers))
            .send()
            .await
            .map_err(|e| FetchError::transport(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::bad_status(url, status.as_u16()));
        }

        let staging = staging_path(destination);
        let bytes = match stream_to_file(response, url, &staging).await {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!(path = %staging.display(), "removing staging file after error");
                let _ = tokio::fs::remove_file(&staging).await;
                return Err(e);
            }
        };

        if let Err(e) = tokio::fs::rename(&staging, destination).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(FetchError::local_write(destination, e));
        }

        if bytes != descriptor.declared_size_bytes {
            warn!(
                bytes,
                declared = descriptor.declared_size_bytes,
                "fetched size differs from declared size; next request will refetch"
            );
        }
        info!(bytes, "fetch complete");
        Ok(bytes)
    }
}

/// Converts resolver headers into a request header map.
///
/// Entries that are not valid HTTP header names or values are skipped.
fn build_headers(headers: &HashMap<String, String>) -> HeaderMap {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                map.insert(name, value);
            }
            _ => warn!(header = %name, "skipping invalid resolver header"),
        }
    }
    map
}

/// Returns a unique hidden sibling path for an in-progress fetch.
fn staging_path(destination: &Path) -> PathBuf {
    let name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let suffix: u64 = rand::random();
    destination.with_file_name(format!(".{name}.{suffix:016x}.part"))
}

/// Streams the response body into a newly created file, returning bytes written.
async fn stream_to_file(
    response: reqwest::Response,
    url: &str,
    file_path: &Path,
) -> Result<u64, FetchError> {
    let file = File::create(file_path)
        .await
        .map_err(|e| FetchError::local_write(file_path, e))?;
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| FetchError::transport(url, e))?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| FetchError::local_write(file_path, e))?;

        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| FetchError::local_write(file_path, e))?;
    writer
        .get_ref()
        .sync_all()
        .await
        .map_err(|e| FetchError::local_write(file_path, e))?;

    Ok(bytes_written)
}
