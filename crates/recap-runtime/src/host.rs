//! Host-page collaborator.
//!
//! The runtime never touches a DOM directly. Everything it needs from the
//! page it is embedded in goes through [`HostPage`]: the current location,
//! text lookups for title strategies, whether a media element exists, and
//! seeking that element.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use scraper::{Html, Selector};

use crate::errors::HostError;

/// Capabilities the runtime requires from its host page.
#[async_trait]
pub trait HostPage: Send + Sync {
    /// Current location href.
    async fn location(&self) -> Result<String, HostError>;

    /// Trimmed text of the first element matching `selector`.
    ///
    /// Falls back to the element's `content` attribute when its text is
    /// empty, so `meta` tags can be queried the same way as headings.
    async fn query_text(&self, selector: &str) -> Result<Option<String>, HostError>;

    /// Raw document title.
    async fn document_title(&self) -> Result<Option<String>, HostError>;

    /// Whether a playable media element exists.
    async fn has_media(&self) -> Result<bool, HostError>;

    /// Seek the media element to `offset_seconds`.
    async fn set_current_time(&self, offset_seconds: f64) -> Result<(), HostError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Snapshot page
// ─────────────────────────────────────────────────────────────────────────────

struct PageState {
    location: String,
    html: String,
    attached: bool,
}

/// A host page backed by a location and an HTML snapshot.
///
/// `navigate` and `set_html` stand in for the host's own navigation, so
/// the watcher can be driven from a command line or a test exactly as it
/// would be from a live page.
pub struct SnapshotPage {
    state: RwLock<PageState>,
    seeks: Mutex<Vec<f64>>,
}

impl SnapshotPage {
    /// A page at `location` with an empty document.
    pub fn new(location: impl Into<String>) -> Self {
        Self::with_html(location, "")
    }

    /// A page at `location` rendering `html`.
    pub fn with_html(location: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            state: RwLock::new(PageState {
                location: location.into(),
                html: html.into(),
                attached: true,
            }),
            seeks: Mutex::new(Vec::new()),
        }
    }

    /// Change the location without re-rendering (history push/replace).
    pub fn navigate(&self, location: impl Into<String>) {
        self.state.write().location = location.into();
    }

    /// Replace the rendered document.
    pub fn set_html(&self, html: impl Into<String>) {
        self.state.write().html = html.into();
    }

    /// Simulate the page context being torn down.
    pub fn detach(&self) {
        self.state.write().attached = false;
    }

    /// Offsets passed to `set_current_time`, in call order.
    pub fn seeks(&self) -> Vec<f64> {
        self.seeks.lock().clone()
    }

    fn with_state<T>(&self, f: impl FnOnce(&PageState) -> T) -> Result<T, HostError> {
        let state = self.state.read();
        if !state.attached {
            return Err(HostError::Detached("page was torn down".into()));
        }
        Ok(f(&state))
    }
}

fn parse_selector(selector: &str) -> Result<Selector, HostError> {
    Selector::parse(selector).map_err(|e| HostError::Query {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}

fn first_text(html: &str, selector: &Selector) -> Option<String> {
    let document = Html::parse_document(html);
    let element = document.select(selector).next()?;
    let text = element.text().collect::<String>();
    let text = text.trim();
    if !text.is_empty() {
        return Some(text.to_string());
    }
    element
        .value()
        .attr("content")
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(ToString::to_string)
}

fn matches_any(html: &str, selector: &Selector) -> bool {
    Html::parse_document(html).select(selector).next().is_some()
}

#[async_trait]
impl HostPage for SnapshotPage {
    async fn location(&self) -> Result<String, HostError> {
        self.with_state(|s| s.location.clone())
    }

    async fn query_text(&self, selector: &str) -> Result<Option<String>, HostError> {
        let selector = parse_selector(selector)?;
        self.with_state(|s| first_text(&s.html, &selector))
    }

    async fn document_title(&self) -> Result<Option<String>, HostError> {
        let selector = parse_selector("title")?;
        self.with_state(|s| first_text(&s.html, &selector))
    }

    async fn has_media(&self) -> Result<bool, HostError> {
        let selector = parse_selector("video")?;
        self.with_state(|s| matches_any(&s.html, &selector))
    }

    async fn set_current_time(&self, offset_seconds: f64) -> Result<(), HostError> {
        if !self.has_media().await? {
            return Err(HostError::MediaNotFound);
        }
        self.seeks.lock().push(offset_seconds.max(0.0));
        Ok(())
    }
}
