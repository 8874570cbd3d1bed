//! Schema-checked decoding of resolver output into a [`MediaDescriptor`].

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::{Number, Value};
use tracing::debug;
use url::Url;

use super::error::ResolutionError;

/// Everything needed to cache-check and fetch one resolved media file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaDescriptor {
    /// Resolver-assigned media id; non-empty and usable as a file stem.
    pub id: String,
    /// File extension of the selected format; non-empty.
    pub extension: String,
    /// Direct media URL.
    pub source_url: Url,
    /// Size the resolver declared for the selected format.
    pub declared_size_bytes: u64,
    /// Headers the origin expects on the fetch (at least a user agent).
    pub fetch_headers: HashMap<String, String>,
}

impl MediaDescriptor {
    /// Returns the flat artifact file name `{id}.{extension}`.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.id, self.extension)
    }
}

/// Fields read from the resolver's JSON record.
#[derive(Debug, Deserialize)]
struct ResolverRecord {
    id: String,
    ext: String,
    url: String,
    #[serde(default)]
    filesize: Option<Number>,
    #[serde(default)]
    filesize_approx: Option<Number>,
    #[serde(default)]
    http_headers: Option<HashMap<String, String>>,
}

/// Decodes one resolver stdout record for `reference`.
///
/// A record whose `url` is absent, null, or blank is `NoMedia`; every other
/// shape problem is `MalformedOutput`.
///
/// # Errors
///
/// Returns [`ResolutionError::MalformedOutput`] or [`ResolutionError::NoMedia`].
pub fn decode_record(reference: &str, stdout: &[u8]) -> Result<MediaDescriptor, ResolutionError> {
    let value: Value = serde_json::from_slice(stdout)
        .map_err(|e| ResolutionError::malformed(format!("invalid JSON: {e}")))?;

    let Value::Object(fields) = &value else {
        return Err(ResolutionError::malformed("expected a JSON object"));
    };

    match fields.get("url") {
        None | Some(Value::Null) => return Err(ResolutionError::no_media(reference)),
        Some(Value::String(url)) if url.trim().is_empty() => {
            return Err(ResolutionError::no_media(reference));
        }
        Some(Value::String(_)) => {}
        Some(_) => return Err(ResolutionError::malformed("`url` is not a string")),
    }

    let record: ResolverRecord = serde_json::from_value(value)
        .map_err(|e| ResolutionError::malformed(e.to_string()))?;

    validate_file_component("id", &record.id)?;
    validate_file_component("ext", &record.ext)?;

    let source_url = Url::parse(record.url.trim())
        .map_err(|e| ResolutionError::malformed(format!("`url` is not a valid URL: {e}")))?;
    if !matches!(source_url.scheme(), "http" | "https") {
        return Err(ResolutionError::malformed(format!(
            "`url` uses unsupported scheme '{}'",
            source_url.scheme()
        )));
    }

    let size = match (&record.filesize, &record.filesize_approx) {
        (Some(size), _) => size,
        (None, Some(approx)) => {
            debug!(id = %record.id, "exact filesize missing, using filesize_approx");
            approx
        }
        (None, None) => {
            return Err(ResolutionError::malformed(
                "neither `filesize` nor `filesize_approx` is present",
            ));
        }
    };
    let declared_size_bytes = coerce_size(size)?;

    Ok(MediaDescriptor {
        id: record.id,
        extension: record.ext,
        source_url,
        declared_size_bytes,
        fetch_headers: record.http_headers.unwrap_or_default(),
    })
}

/// Converts any JSON number encoding into a non-negative byte count.
///
/// Fractional values are truncated.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
fn coerce_size(number: &Number) -> Result<u64, ResolutionError> {
    if let Some(size) = number.as_u64() {
        return Ok(size);
    }
    match number.as_f64() {
        Some(size) if size.is_finite() && size >= 0.0 && size < u64::MAX as f64 => {
            Ok(size.trunc() as u64)
        }
        _ => Err(ResolutionError::malformed(format!(
            "declared size {number} is not a non-negative byte count"
        ))),
    }
}

/// Rejects values that cannot serve as one component of a flat file name.
fn validate_file_component(field: &str, value: &str) -> Result<(), ResolutionError> {
    if value.is_empty() {
        return Err(ResolutionError::malformed(format!("`{field}` is empty")));
    }
    if value == "." || value == ".." || value.contains(['/', '\\', '\0']) {
        return Err(ResolutionError::malformed(format!(
            "`{field}` '{value}' is not a valid file name component"
        )));
    }
    Ok(())
}
