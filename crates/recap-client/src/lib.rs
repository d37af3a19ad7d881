//! # recap-client
//!
//! Remote fetch operations against the transcript/summary service.
//!
//! - [`TranscriptService`]: the trait every consumer depends on
//! - [`HttpTranscriptService`]: `reqwest` implementation with per-request timeout
//! - [`MockTranscriptService`]: scripted implementation for tests
//!
//! ## Crate Position
//!
//! Depends on recap-core and recap-settings.
//! Depended on by: recap-runtime, recap.

#![deny(unsafe_code)]

pub mod errors;
pub mod http;
pub mod mock;
pub mod service;

pub use errors::{FetchError, Result};
pub use http::HttpTranscriptService;
pub use mock::{FetchOp, MockTranscriptService, Scripted};
pub use service::{SummaryEnvelope, TranscriptEnvelope, TranscriptService};
