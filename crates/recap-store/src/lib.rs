//! # recap-store
//!
//! Shared artifact store access and cross-context notification.
//!
//! - [`KeyValueStore`]: async get/set contract of the shared store
//! - [`MemoryStore`], [`JsonFileStore`]: in-process and file-backed backends
//! - [`ArtifactRepository`]: `artifact:<id>` / `current` key layout and commit contract
//! - [`Notifier`], [`BroadcastNotifier`]: `ARTIFACT_READY` fan-out to live contexts
//!
//! ## Crate Position
//!
//! Depends on recap-core.
//! Depended on by: recap-runtime, recap.

#![deny(unsafe_code)]

pub mod errors;
pub mod file;
pub mod kv;
pub mod memory;
pub mod notifier;
pub mod repository;

pub use errors::{NotifyError, Result, StoreError};
pub use file::JsonFileStore;
pub use kv::KeyValueStore;
pub use memory::MemoryStore;
pub use notifier::{Ack, BroadcastNotifier, ContextNotifier, Notifier};
pub use repository::{
    ARTIFACT_KEY_PREFIX, ArtifactRepository, CURRENT_KEY, CurrentPointer, artifact_key,
};
