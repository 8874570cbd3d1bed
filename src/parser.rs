//! Recognition of the single supported link shape.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

/// A YouTube watch URL, optionally without the `https://` prefix.
///
/// Anchored at both ends. The video token and any `&`-separated query
/// parameters exclude `:`, `/` and separators, so a second link glued onto the
/// first never matches.
#[allow(clippy::expect_used)]
static WATCH_URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(https://)?www\.youtube\.com/watch\?v=([A-Za-z0-9_-]+)(&[A-Za-z0-9_.~%+=-]*)*$")
        .expect("watch URL regex is valid") // Static pattern, safe to panic
});

/// Raw link text accepted by [`match_reference`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaReference(String);

impl MediaReference {
    /// Returns the link exactly as it will be handed to the resolver.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MediaReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Returns the reference when `text` is exactly one supported link.
///
/// Surrounding whitespace is ignored. Anything else (empty input, several
/// links, another domain, `http://` or another scheme) yields `None`.
///
/// # Examples
///
/// ```
/// use audio_relay::parser::match_reference;
///
/// assert!(match_reference("https://www.youtube.com/watch?v=ABC123").is_some());
/// assert!(match_reference("https://vimeo.com/123").is_none());
/// ```
#[must_use]
pub fn match_reference(text: &str) -> Option<MediaReference> {
    let candidate = text.trim();
    let matched = WATCH_URL_PATTERN.is_match(candidate);
    trace!(matched, "link match attempted");
    matched.then(|| MediaReference(candidate.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_match_full_https_url() {
        let reference = match_reference("https://www.youtube.com/watch?v=ABC123").unwrap();
        assert_eq!(reference.as_str(), "https://www.youtube.com/watch?v=ABC123");
    }

    #[test]
    fn test_match_schemeless_url() {
        let reference = match_reference("www.youtube.com/watch?v=dQw4w9WgXcQ").unwrap();
        assert_eq!(reference.as_str(), "www.youtube.com/watch?v=dQw4w9WgXcQ");
    }

    #[test]
    fn test_match_trims_surrounding_whitespace() {
        let reference = match_reference("  https://www.youtube.com/watch?v=ABC123\n").unwrap();
        assert_eq!(reference.to_string(), "https://www.youtube.com/watch?v=ABC123");
    }

    #[test]
    fn test_match_keeps_extra_query_parameters() {
        assert!(match_reference("https://www.youtube.com/watch?v=ABC123&t=42").is_some());
        assert!(
            match_reference("https://www.youtube.com/watch?v=dQw4w9WgXcQ&list=PL-x_1&index=2")
                .is_some()
        );
    }

    #[test]
    fn test_reject_empty_and_blank() {
        assert!(match_reference("").is_none());
        assert!(match_reference("   ").is_none());
    }

    #[test]
    fn test_reject_multiple_links() {
        let text = "https://www.youtube.com/watch?v=A https://www.youtube.com/watch?v=B";
        assert!(match_reference(text).is_none());
        let text = "https://www.youtube.com/watch?v=A\nhttps://www.youtube.com/watch?v=B";
        assert!(match_reference(text).is_none());
    }

    #[test]
    fn test_reject_links_joined_without_whitespace() {
        for text in [
            "https://www.youtube.com/watch?v=A,https://www.youtube.com/watch?v=B",
            "https://www.youtube.com/watch?v=Ahttps://www.youtube.com/watch?v=B",
            "https://www.youtube.com/watch?v=A&https://www.youtube.com/watch?v=B",
            "www.youtube.com/watch?v=A;www.youtube.com/watch?v=B",
            "https://www.youtube.com/watch?v=A&list=www.youtube.com/watch?v=B",
        ] {
            assert!(match_reference(text).is_none(), "accepted joined links: {text}");
        }
    }

    #[test]
    fn test_reject_punctuation_in_video_token() {
        assert!(match_reference("https://www.youtube.com/watch?v=ABC123,").is_none());
        assert!(match_reference("https://www.youtube.com/watch?v=ABC<123>").is_none());
    }

    #[test]
    fn test_reject_wrong_domain() {
        assert!(match_reference("https://youtube.com/watch?v=ABC123").is_none());
        assert!(match_reference("https://youtu.be/ABC123").is_none());
        assert!(match_reference("https://www.example.com/watch?v=ABC123").is_none());
    }

    #[test]
    fn test_reject_other_schemes() {
        assert!(match_reference("http://www.youtube.com/watch?v=ABC123").is_none());
        assert!(match_reference("ftp://www.youtube.com/watch?v=ABC123").is_none());
        assert!(match_reference("https:/www.youtube.com/watch?v=ABC123").is_none());
    }

    #[test]
    fn test_reject_link_embedded_in_text() {
        assert!(match_reference("listen to https://www.youtube.com/watch?v=ABC123").is_none());
    }

    #[test]
    fn test_reject_missing_video_token() {
        assert!(match_reference("https://www.youtube.com/watch?v=").is_none());
    }
}
