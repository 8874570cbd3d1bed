//! Failure classification and user-facing reporting.
//!
//! Every terminal failure is reported twice: a generic chat text that never
//! carries internal detail, and a [`LogRecord`] holding the kind and cause for
//! the operational log. [`report`] is the pure mapping between the two.

use std::fmt;

use crate::download::FetchError;
use crate::resolver::ResolutionError;

/// Acknowledgement sent when a supported link is accepted.
pub const ACCEPTED_TEXT: &str = "OK! Music downloading...";

const UNSUPPORTED_TEXT: &str = "Sorry, I can only handle single YouTube URL at a time";
const PROCESS_FAILED_TEXT: &str =
    "Sorry, there is something wrong at my side. Please try again later QwQ";
const MALFORMED_OUTPUT_TEXT: &str =
    "Sorry, there is something wrong at my side while parsing JSON response. Please try again later QwQ";
const NO_MEDIA_TEXT: &str = "Sorry, the JSON response is malformatted. Please try again later QwQ";
const FETCH_FAILED_TEXT: &str =
    "Sorry, cannot download the requested music file now. Please try again later QwQ";

/// Sent when the artifact exists but uploading it to the chat failed.
pub const DELIVERY_FAILED_TEXT: &str = FETCH_FAILED_TEXT;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Any terminal failure of a request.
#[derive(Debug)]
pub enum Failure {
    /// The text is not exactly one supported link.
    Unsupported,
    /// The resolver produced no descriptor.
    Resolution(ResolutionError),
    /// The size policy or the fetch failed.
    Fetch(FetchError),
}

impl From<ResolutionError> for Failure {
    fn from(error: ResolutionError) -> Self {
        Self::Resolution(error)
    }
}

impl From<FetchError> for Failure {
    fn from(error: FetchError) -> Self {
        Self::Fetch(error)
    }
}

/// Top-level error family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    UnsupportedRequest,
    Resolution,
    Policy,
    Fetch,
}

/// Concrete failure kind, one per taxonomy leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    UnsupportedRequest,
    ProcessFailed,
    MalformedOutput,
    NoMedia,
    TooLarge,
    BadStatus,
    Transport,
    LocalWrite,
}

impl FailureKind {
    /// Returns the family this kind belongs to.
    #[must_use]
    pub fn category(self) -> FailureCategory {
        match self {
            Self::UnsupportedRequest => FailureCategory::UnsupportedRequest,
            Self::ProcessFailed | Self::MalformedOutput | Self::NoMedia => {
                FailureCategory::Resolution
            }
            Self::TooLarge => FailureCategory::Policy,
            Self::BadStatus | Self::Transport | Self::LocalWrite => FailureCategory::Fetch,
        }
    }

    /// Returns the stable label used in log records.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UnsupportedRequest => "UnsupportedRequest",
            Self::ProcessFailed => "ProcessFailed",
            Self::MalformedOutput => "MalformedOutput",
            Self::NoMedia => "NoMedia",
            Self::TooLarge => "TooLarge",
            Self::BadStatus => "BadStatus",
            Self::Transport => "Transport",
            Self::LocalWrite => "LocalWrite",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Failure {
    /// Returns the concrete kind of this failure.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Unsupported => FailureKind::UnsupportedRequest,
            Self::Resolution(ResolutionError::ProcessFailed { .. }) => FailureKind::ProcessFailed,
            Self::Resolution(ResolutionError::MalformedOutput { .. }) => {
                FailureKind::MalformedOutput
            }
            Self::Resolution(ResolutionError::NoMedia { .. }) => FailureKind::NoMedia,
            Self::Fetch(FetchError::TooLarge { .. }) => FailureKind::TooLarge,
            Self::Fetch(FetchError::BadStatus { .. }) => FailureKind::BadStatus,
            Self::Fetch(FetchError::Transport { .. }) => FailureKind::Transport,
            Self::Fetch(FetchError::LocalWrite { .. }) => FailureKind::LocalWrite,
        }
    }
}

/// Detail destined for the operational log only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub kind: FailureKind,
    pub category: FailureCategory,
    /// Full error chain, when the failure wraps an error.
    pub cause: Option<String>,
}

/// Chat text plus log record for one failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReport {
    pub chat_text: String,
    pub log: LogRecord,
}

/// Signature of the reporting function injected into the orchestrator.
pub type Reporter = fn(&Failure) -> FailureReport;

/// Maps a failure onto its chat text and log record.
#[must_use]
pub fn report(failure: &Failure) -> FailureReport {
    let kind = failure.kind();
    let chat_text = match failure {
        Failure::Unsupported => UNSUPPORTED_TEXT.to_string(),
        Failure::Resolution(ResolutionError::ProcessFailed { .. }) => {
            PROCESS_FAILED_TEXT.to_string()
        }
        Failure::Resolution(ResolutionError::MalformedOutput { .. }) => {
            MALFORMED_OUTPUT_TEXT.to_string()
        }
        Failure::Resolution(ResolutionError::NoMedia { .. }) => NO_MEDIA_TEXT.to_string(),
        // Rounded up so a sub-MiB ceiling never reads as 0MB.
        Failure::Fetch(FetchError::TooLarge { ceiling_bytes, .. }) => format!(
            "Sorry, the audio file size is larger than {}MB.",
            ceiling_bytes.div_ceil(BYTES_PER_MB)
        ),
        Failure::Fetch(_) => FETCH_FAILED_TEXT.to_string(),
    };
    let cause = match failure {
        Failure::Unsupported => None,
        Failure::Resolution(error) => Some(error_chain(error)),
        Failure::Fetch(error) => Some(error_chain(error)),
    };
    FailureReport {
        chat_text,
        log: LogRecord {
            kind,
            category: kind.category(),
            cause,
        },
    }
}

/// Renders an error and its sources as `outer: inner: ...`.
fn error_chain(error: &dyn std::error::Error) -> String {
    let mut rendered = error.to_string();
    let mut source = error.source();
    while let Some(inner) = source {
        let text = inner.to_string();
        if !rendered.contains(&text) {
            rendered.push_str(": ");
            rendered.push_str(&text);
        }
        source = inner.source();
    }
    rendered
}
