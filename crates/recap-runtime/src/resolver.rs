//! Subject resolution from URLs.
//!
//! Pure functions: same input, same output, no I/O.

use std::sync::LazyLock;

use recap_core::SubjectId;
use regex::Regex;
use url::Url;

/// Recognizes watch, embed, `/v/`, `/e/`, nested-path and short-link forms.
static SUBJECT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?:youtube\.com/(?:[^/]+/.+/|(?:v|e(?:mbed)?)/|.*[?&]v=)|youtu\.be/)([^"&?/\s]{11})"#,
    )
    .expect("subject pattern is valid")
});

/// Extract the subject addressed by `url`, or `None` if it addresses no
/// single video (home, search, channel pages, unparseable input).
pub fn resolve_subject(url: &str) -> Option<SubjectId> {
    let captures = SUBJECT_PATTERN.captures(url)?;
    SubjectId::parse(captures.get(1)?.as_str()).ok()
}

/// Whether `url` is a standard watch page (`youtube.com/watch?v=...`).
pub fn is_watch_page(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let host_matches = parsed
        .host_str()
        .is_some_and(|h| h.contains("youtube.com"));
    let has_video_param = parsed.query().is_some_and(|q| q.contains("v="));
    host_matches && parsed.path() == "/watch" && has_video_param
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn resolved(url: &str) -> Option<String> {
        resolve_subject(url).map(|id| id.as_str().to_string())
    }

    #[test]
    fn watch_urls() {
        assert_eq!(
            resolved("https://www.youtube.com/watch?v=abc12345678").as_deref(),
            Some("abc12345678")
        );
        assert_eq!(
            resolved("https://www.youtube.com/watch?list=PL1&v=xyz98765432&index=3").as_deref(),
            Some("xyz98765432")
        );
        assert_eq!(
            resolved("https://m.youtube.com/watch?v=CRraHg4Ks_g&t=10s").as_deref(),
            Some("CRraHg4Ks_g")
        );
        assert_eq!(
            resolved("https://www.youtube.com/watch?v=abc12345678&t=42s").as_deref(),
            Some("abc12345678")
        );
    }

    #[test]
    fn short_embed_and_legacy_urls() {
        assert_eq!(resolved("https://youtu.be/abc12345678").as_deref(), Some("abc12345678"));
        assert_eq!(
            resolved("https://www.youtube.com/embed/abc12345678?autoplay=1").as_deref(),
            Some("abc12345678")
        );
        assert_eq!(resolved("https://www.youtube.com/v/abc12345678").as_deref(), Some("abc12345678"));
        assert_eq!(resolved("https://www.youtube.com/e/abc12345678").as_deref(), Some("abc12345678"));
    }

    #[test]
    fn non_subject_pages() {
        assert_eq!(resolved("https://www.youtube.com/"), None);
        assert_eq!(resolved("https://www.youtube.com/results?search_query=rust"), None);
        assert_eq!(resolved("https://www.youtube.com/feed/subscriptions"), None);
        assert_eq!(resolved("https://example.com/watch?v=abc12345678"), None);
        assert_eq!(resolved("not a url at all"), None);
        assert_eq!(resolved(""), None);
    }

    #[test]
    fn too_short_token_is_none() {
        assert_eq!(resolved("https://www.youtube.com/watch?v=abc"), None);
    }

    #[test]
    fn watch_page_detection() {
        assert!(is_watch_page("https://www.youtube.com/watch?v=abc12345678"));
        assert!(!is_watch_page("https://www.youtube.com/watch"));
        assert!(!is_watch_page("https://www.youtube.com/results?v=abc12345678"));
        assert!(!is_watch_page("https://youtu.be/abc12345678"));
        assert!(!is_watch_page("https://example.com/watch?v=abc12345678"));
        assert!(!is_watch_page("garbage"));
    }

    proptest! {
        #[test]
        fn resolution_is_deterministic(url in "\\PC{0,80}") {
            prop_assert_eq!(resolve_subject(&url), resolve_subject(&url));
        }

        #[test]
        fn any_valid_token_roundtrips_through_watch_url(token in "[A-Za-z0-9_-]{11}") {
            let url = format!("https://www.youtube.com/watch?v={token}");
            let id = resolve_subject(&url).unwrap();
            prop_assert_eq!(id.as_str(), token.as_str());
        }
    }
}
