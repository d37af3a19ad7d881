//! Display helpers for titles and transcript offsets.

/// Suffix the host appends to every document title.
const HOST_TITLE_SUFFIX: &str = " - YouTube";

/// Bare document title the host shows before a video has loaded.
const HOST_BARE_TITLE: &str = "YouTube";

/// Format an offset in seconds as `M:SS`.
///
/// Minutes are not padded and are not rolled into hours; fractional seconds
/// are floored. Negative and non-finite inputs render as `0:00`.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return "0:00".to_string();
    }
    let whole = seconds.floor() as u64;
    format!("{}:{:02}", whole / 60, whole % 60)
}

/// Clean a document-level title for display.
///
/// Strips the host suffix and surrounding whitespace. Returns `None` when
/// nothing meaningful is left (empty, or the bare host name).
pub fn sanitize_document_title(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == HOST_BARE_TITLE {
        return None;
    }
    let cleaned = trimmed.replace(HOST_TITLE_SUFFIX, "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn format_time_basic() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(9.99), "0:09");
        assert_eq!(format_time(60.0), "1:00");
        assert_eq!(format_time(125.4), "2:05");
        assert_eq!(format_time(65.9), "1:05");
    }

    #[test]
    fn format_time_never_rolls_into_hours() {
        assert_eq!(format_time(3600.0), "60:00");
        assert_eq!(format_time(7325.0), "122:05");
    }

    #[test]
    fn format_time_degenerate_inputs() {
        assert_eq!(format_time(-3.0), "0:00");
        assert_eq!(format_time(f64::NAN), "0:00");
        assert_eq!(format_time(f64::INFINITY), "0:00");
    }

    #[test]
    fn sanitize_strips_suffix() {
        assert_eq!(
            sanitize_document_title("  Rust in 100 Seconds - YouTube "),
            Some("Rust in 100 Seconds".to_string())
        );
    }

    #[test]
    fn sanitize_rejects_bare_host() {
        assert_eq!(sanitize_document_title("YouTube"), None);
        assert_eq!(sanitize_document_title("   "), None);
        assert_eq!(sanitize_document_title(" - YouTube"), None);
    }

    #[test]
    fn sanitize_keeps_plain_titles() {
        assert_eq!(
            sanitize_document_title("Some page"),
            Some("Some page".to_string())
        );
    }

    proptest! {
        #[test]
        fn format_time_seconds_always_two_digits(secs in 0.0f64..1_000_000.0) {
            let s = format_time(secs);
            let (_, sec_part) = s.split_once(':').unwrap();
            prop_assert_eq!(sec_part.len(), 2);
            prop_assert!(sec_part.parse::<u8>().unwrap() < 60);
        }
    }
}
