//! Cross-context event shapes.
//!
//! [`ArtifactEvent`] is what one context broadcasts to every other live
//! context; [`Envelope`] adds the label of the sending context so
//! consumers such as the availability badge can attribute it.

use serde::{Deserialize, Serialize};

use crate::artifact::Artifact;
use crate::ids::SubjectId;

/// Event broadcast when a context has committed a fresh artifact.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArtifactEvent {
    /// A new artifact is readable from the shared store.
    #[serde(rename_all = "camelCase")]
    ArtifactReady {
        /// Subject the artifact belongs to.
        subject_id: SubjectId,
        /// The committed artifact.
        artifact: Artifact,
    },
}

impl ArtifactEvent {
    /// Build an `ARTIFACT_READY` event from a committed artifact.
    pub fn ready(artifact: Artifact) -> Self {
        Self::ArtifactReady {
            subject_id: artifact.subject_id.clone(),
            artifact,
        }
    }

    /// Wire name of the event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ArtifactReady { .. } => "ARTIFACT_READY",
        }
    }

    /// Subject the event refers to.
    pub fn subject_id(&self) -> &SubjectId {
        match self {
            Self::ArtifactReady { subject_id, .. } => subject_id,
        }
    }
}

/// An event together with the label of the context that sent it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Sending context (for example a tab label), if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    /// The event itself.
    pub event: ArtifactEvent,
}
