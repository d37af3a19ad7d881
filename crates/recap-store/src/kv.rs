//! Key/value store trait shared by every execution context.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::errors::Result;

/// Async key/value store visible to multiple execution contexts.
///
/// Each `set` is atomic for all the entries it carries. Writes from one
/// context become visible to another only after the backend's own
/// durability step, so readers must tolerate slightly stale data.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the given keys. Missing keys are absent from the returned map.
    async fn get(&self, keys: &[String]) -> Result<Map<String, Value>>;

    /// Write all entries in one step, replacing existing values.
    async fn set(&self, entries: Map<String, Value>) -> Result<()>;
}
