//! Best-effort display title lookup.
//!
//! Strategies run in order; the first non-empty answer wins. A strategy
//! that errors is treated exactly like one that found nothing.

use recap_core::UNKNOWN_TITLE;
use recap_core::text::sanitize_document_title;
use tracing::debug;

use crate::host::HostPage;

/// One way of finding the title on a page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TitleStrategy {
    /// Text (or `content`) of the first element matching a CSS selector.
    Selector(&'static str),
    /// The document title with the host suffix stripped.
    DocumentTitle,
}

/// Strategies in priority order. Current layouts first, legacy layouts
/// and player overlays after, document metadata last.
pub const TITLE_STRATEGIES: &[TitleStrategy] = &[
    TitleStrategy::Selector("h1.ytd-watch-metadata yt-formatted-string"),
    TitleStrategy::Selector("h1.title.style-scope.ytd-video-primary-info-renderer"),
    TitleStrategy::Selector("h1.style-scope.ytd-video-primary-info-renderer"),
    TitleStrategy::Selector("h1 yt-formatted-string"),
    TitleStrategy::Selector(".watch-title"),
    TitleStrategy::Selector("#watch-headline-title"),
    TitleStrategy::Selector(".ytp-title-link"),
    TitleStrategy::Selector(r#"meta[name="title"]"#),
    TitleStrategy::DocumentTitle,
];

impl TitleStrategy {
    async fn apply(self, page: &dyn HostPage) -> Option<String> {
        let found = match self {
            Self::Selector(selector) => page.query_text(selector).await,
            Self::DocumentTitle => page
                .document_title()
                .await
                .map(|t| t.as_deref().and_then(sanitize_document_title)),
        };
        match found {
            Ok(Some(title)) if !title.trim().is_empty() => Some(title.trim().to_string()),
            Ok(_) => None,
            Err(e) => {
                debug!(strategy = ?self, error = %e, "title strategy failed");
                None
            }
        }
    }
}

/// Resolve the display title of the page, never failing.
///
/// Falls back to [`UNKNOWN_TITLE`] when every strategy comes up empty.
pub async fn resolve_title(page: &dyn HostPage) -> String {
    for strategy in TITLE_STRATEGIES {
        if let Some(title) = strategy.apply(page).await {
            debug!(?strategy, %title, "title resolved");
            return title;
        }
    }
    debug!("no title strategy matched");
    UNKNOWN_TITLE.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::SnapshotPage;

    async fn title_of(html: &str) -> String {
        let page = SnapshotPage::with_html("https://www.youtube.com/watch?v=abc12345678", html);
        resolve_title(&page).await
    }

    #[tokio::test]
    async fn modern_layout_wins() {
        let html = r#"<h1 class="style-scope ytd-watch-metadata"><yt-formatted-string>Modern</yt-formatted-string></h1>
            <div class="watch-title">Legacy</div><title>Doc - YouTube</title>"#;
        assert_eq!(title_of(html).await, "Modern");
    }

    #[tokio::test]
    async fn falls_through_empty_matches() {
        let html = r#"<h1 class="style-scope ytd-watch-metadata"><yt-formatted-string>   </yt-formatted-string></h1>
            <span id="watch-headline-title">Headline</span>"#;
        assert_eq!(title_of(html).await, "Headline");
    }

    #[tokio::test]
    async fn meta_title_before_document_title() {
        let html = r#"<head><title>Doc - YouTube</title><meta name="title" content="From Meta"></head>"#;
        assert_eq!(title_of(html).await, "From Meta");
    }

    #[tokio::test]
    async fn document_title_is_sanitized() {
        assert_eq!(title_of("<title>Some Talk - YouTube</title>").await, "Some Talk");
    }

    #[tokio::test]
    async fn bare_host_title_gives_placeholder() {
        assert_eq!(title_of("<title>YouTube</title>").await, UNKNOWN_TITLE);
        assert_eq!(title_of("").await, UNKNOWN_TITLE);
    }

    #[tokio::test]
    async fn detached_page_gives_placeholder() {
        let page = SnapshotPage::with_html("https://x", "<title>Real</title>");
        page.detach();
        assert_eq!(resolve_title(&page).await, UNKNOWN_TITLE);
    }
}
