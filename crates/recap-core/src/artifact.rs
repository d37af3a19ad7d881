//! Artifact data model.
//!
//! - [`Segment`]: one timed line of a transcript
//! - [`Summary`]: an optional generated summary (plain text or typed blocks)
//! - [`Artifact`]: the durable record committed per subject

use serde::{Deserialize, Serialize};

use crate::ids::SubjectId;

/// Placeholder title used when no title strategy matches.
pub const UNKNOWN_TITLE: &str = "Unknown Title";

/// Locale tag stamped on every artifact.
pub const DEFAULT_LANGUAGE: &str = "en";

// ─────────────────────────────────────────────────────────────────────────────
// Transcript
// ─────────────────────────────────────────────────────────────────────────────

/// One timed transcript line.
///
/// Field names match the remote service wire format (`start`, not
/// `startOffset`), so the same type decodes responses and encodes
/// stored artifacts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Spoken text.
    pub text: String,
    /// Offset from the start of the media, in seconds.
    pub start: f64,
    /// How long the line is on screen, in seconds.
    pub duration: f64,
}

impl Segment {
    /// Build a segment.
    pub fn new(text: impl Into<String>, start: f64, duration: f64) -> Self {
        Self {
            text: text.into(),
            start,
            duration,
        }
    }

    /// Offset at which this segment stops being spoken.
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Summary
// ─────────────────────────────────────────────────────────────────────────────

/// One typed block of a formatted summary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SummarySection {
    /// Free-standing paragraph.
    Paragraph {
        /// Paragraph text.
        #[serde(default)]
        content: String,
    },
    /// Heading with a nesting level (1 = top).
    Header {
        /// Heading text.
        #[serde(default)]
        content: String,
        /// Heading level.
        #[serde(default = "default_level")]
        level: u8,
    },
    /// Bulleted list.
    List {
        /// List entries in order.
        #[serde(default)]
        items: Vec<String>,
    },
}

fn default_level() -> u8 {
    1
}

/// A generated summary document.
///
/// `formatted_text` is always present; `sections` carries the typed block
/// structure when the generator produced one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Plain-text rendering of the whole summary.
    pub formatted_text: String,
    /// Whether `sections` carries meaningful structure.
    #[serde(default)]
    pub has_formatting: bool,
    /// Typed blocks, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sections: Option<Vec<SummarySection>>,
}

impl Summary {
    /// A summary with no block structure.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            formatted_text: text.into(),
            has_formatting: false,
            sections: None,
        }
    }

    /// Typed blocks, or an empty slice for plain summaries.
    pub fn blocks(&self) -> &[SummarySection] {
        self.sections.as_deref().unwrap_or_default()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Artifact
// ─────────────────────────────────────────────────────────────────────────────

/// The persisted transcript + summary record for one subject.
///
/// Always fully formed: `segments` is present (possibly empty) and
/// `summary` is definitely present or absent. An empty `segments` means
/// "no transcript available" and is distinct from a missing artifact.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    /// Immutable key.
    pub subject_id: SubjectId,
    /// Best-effort display title.
    pub title: String,
    /// Transcript lines in chronological order.
    #[serde(default)]
    pub segments: Vec<Segment>,
    /// Generated summary, absent when not generated or not available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<Summary>,
    /// Locale tag.
    pub language: String,
}

impl Artifact {
    /// Build an artifact with the default language and no summary.
    pub fn new(subject_id: SubjectId, title: impl Into<String>, segments: Vec<Segment>) -> Self {
        Self {
            subject_id,
            title: title.into(),
            segments,
            summary: None,
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }

    /// Attach a summary.
    #[must_use]
    pub fn with_summary(mut self, summary: Option<Summary>) -> Self {
        self.summary = summary;
        self
    }

    /// Override the language tag.
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Whether any transcript lines are available.
    pub fn has_transcript(&self) -> bool {
        !self.segments.is_empty()
    }

    /// Total covered duration in seconds (end of the last segment).
    pub fn duration(&self) -> f64 {
        self.segments.last().map_or(0.0, Segment::end)
    }

    /// Index of the segment being spoken at `offset`, if any.
    pub fn segment_at(&self, offset: f64) -> Option<usize> {
        self.segments
            .iter()
            .position(|s| offset >= s.start && offset < s.end())
    }
}
