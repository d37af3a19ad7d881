//! # recap-runtime
//!
//! The moving parts of the Recap pipeline.
//!
//! - **Resolution**: [`resolver::resolve_subject`] and [`title::resolve_title`]
//! - **Host page**: [`host::HostPage`] capability trait and [`host::SnapshotPage`]
//! - **Watching**: [`watcher::NavigationWatcher`] collapses navigation signals into subject changes
//! - **Background path**: [`coordinator::ExtractionCoordinator`] primes the shared store
//! - **Read path**: [`reconciler::ReadPathReconciler`] serves the on-demand surface
//! - **Badge**: [`badge::BadgeTracker`] per-context availability indicator
//!
//! ## Crate Position
//!
//! Depends on recap-core, recap-settings, recap-client, recap-store.
//! Depended on by: recap.

#![deny(unsafe_code)]

pub mod badge;
pub mod coordinator;
pub mod errors;
pub mod host;
pub mod reconciler;
pub mod resolver;
pub mod signals;
pub mod title;
pub mod watcher;

pub use badge::{Badge, BadgeTracker};
pub use coordinator::{CycleOutcome, ExtractionCoordinator, InFlight};
pub use errors::{HostError, ReconcileError};
pub use host::{HostPage, SnapshotPage};
pub use reconciler::{ReadPathReconciler, ReadState};
pub use resolver::{is_watch_page, resolve_subject};
pub use signals::NavigationSignal;
pub use title::{TITLE_STRATEGIES, TitleStrategy, resolve_title};
pub use watcher::{GateOutcome, NavigationWatcher, SubjectHandler, WatcherConfig, WatcherHandle};
