//! Per-context availability badge.
//!
//! Listens to the notifier and remembers, for each sending context, whether
//! a transcript has been primed for the page it is showing.

use std::collections::HashMap;

use parking_lot::RwLock;
use recap_core::{ArtifactEvent, Envelope};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::resolver::is_watch_page;

/// Badge shown for one context.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Badge {
    /// Nothing to show.
    #[default]
    Clear,
    /// An artifact is ready for the context's page.
    Ready,
}

impl Badge {
    /// Badge text.
    pub fn text(self) -> &'static str {
        match self {
            Self::Clear => "",
            Self::Ready => "✓",
        }
    }

    /// Badge background color.
    pub fn color(self) -> Option<&'static str> {
        match self {
            Self::Clear => None,
            Self::Ready => Some("#22c55e"),
        }
    }
}

/// Tracks badges for every context that has sent an event.
#[derive(Default)]
pub struct BadgeTracker {
    badges: RwLock<HashMap<String, Badge>>,
}

impl BadgeTracker {
    /// Create a tracker with every badge clear.
    pub fn new() -> Self {
        Self::default()
    }

    /// Badge for `context`.
    pub fn badge(&self, context: &str) -> Badge {
        self.badges.read().get(context).copied().unwrap_or_default()
    }

    /// Apply one notifier envelope. Envelopes without a sender are ignored.
    pub fn apply(&self, envelope: &Envelope) {
        let Some(sender) = envelope.sender.as_deref() else {
            return;
        };
        match &envelope.event {
            ArtifactEvent::ArtifactReady { subject_id, .. } => {
                debug!(context = sender, subject_id = %subject_id, "badge ready");
                let _ = self.badges.write().insert(sender.to_string(), Badge::Ready);
            }
        }
    }

    /// A context navigated; leaving the watch page clears its badge.
    pub fn on_navigation(&self, context: &str, url: &str) {
        if !is_watch_page(url) {
            let _ = self.badges.write().remove(context);
        }
    }

    /// Consume envelopes until the channel closes.
    pub async fn run(&self, mut rx: broadcast::Receiver<Envelope>) {
        loop {
            match rx.recv().await {
                Ok(envelope) => self.apply(&envelope),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "badge tracker lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }
}
