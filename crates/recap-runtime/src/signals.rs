//! Navigation signals delivered by the host.

use std::fmt;

/// A low-level hint that the page may now address a different subject.
///
/// Hosts deliver these through the watcher's subscription channel. Several
/// may fire for one real navigation; the watcher collapses them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NavigationSignal {
    /// Structural DOM mutation.
    Mutation,
    /// `history.pushState` was called.
    PushState,
    /// `history.replaceState` was called.
    ReplaceState,
    /// Back/forward navigation (`popstate`).
    PopState,
    /// The player poll found a media element.
    PlayerReady,
    /// The watcher was (re)attached to a page context.
    Activation,
}

impl NavigationSignal {
    /// Label used in logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mutation => "mutation",
            Self::PushState => "push_state",
            Self::ReplaceState => "replace_state",
            Self::PopState => "pop_state",
            Self::PlayerReady => "player_ready",
            Self::Activation => "activation",
        }
    }
}

impl fmt::Display for NavigationSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
