//! Fallback User-Agent for media fetches.
//!
//! Resolver-supplied headers normally carry the User-Agent the origin expects;
//! this one is only sent when the resolver provided none.

const PROJECT_UA_URL: &str = "https://github.com/fierce/audio-relay";

/// Default User-Agent for fetch requests (identifies the tool).
#[must_use]
pub(crate) fn default_fetch_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("audio-relay/{version} (+{PROJECT_UA_URL})")
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_ua_contains_version_and_url() {
        let ua = default_fetch_user_agent();
        assert!(ua.contains(PROJECT_UA_URL), "UA must contain project URL: {ua}");
        assert_eq!(
            env!("CARGO_PKG_VERSION"),
            ua.strip_prefix("audio-relay/")
                .and_then(|s| s.split(' ').next())
                .expect("UA has version"),
        );
    }
}
