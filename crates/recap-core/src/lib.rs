//! # recap-core
//!
//! Foundation types for the Recap transcript pipeline.
//!
//! - **Identifiers**: [`ids::SubjectId`], the validated video token used as cache key
//! - **Artifacts**: [`artifact::Artifact`], [`artifact::Segment`], [`artifact::Summary`]
//! - **Events**: [`events::ArtifactEvent`] broadcast between contexts
//! - **Text**: [`text::format_time`] and document-title cleanup
//! - **Logging**: [`logging::init_logging`] tracing bootstrap
//!
//! ## Crate Position
//!
//! Foundation crate. Depended on by all other recap crates.

#![deny(unsafe_code)]

pub mod artifact;
pub mod events;
pub mod ids;
pub mod logging;
pub mod text;

pub use artifact::{Artifact, DEFAULT_LANGUAGE, Segment, Summary, SummarySection, UNKNOWN_TITLE};
pub use events::{ArtifactEvent, Envelope};
pub use ids::{InvalidSubjectId, SUBJECT_ID_LEN, SubjectId};
