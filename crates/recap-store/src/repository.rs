//! Typed artifact access over a [`KeyValueStore`].
//!
//! Key layout:
//! - `artifact:<subjectId>` holds the latest [`Artifact`] for that subject
//! - `current` holds a [`CurrentPointer`] to the most recently resolved subject
//!
//! Entries are never deleted. Every subject ever visited keeps one entry,
//! so the store grows without bound over a long browsing history.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use recap_core::{Artifact, SubjectId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::errors::Result;
use crate::kv::KeyValueStore;

/// Key of the current-subject pointer.
pub const CURRENT_KEY: &str = "current";

/// Prefix of per-subject artifact keys.
pub const ARTIFACT_KEY_PREFIX: &str = "artifact:";

/// Store key for a subject's artifact.
pub fn artifact_key(subject_id: &SubjectId) -> String {
    format!("{ARTIFACT_KEY_PREFIX}{subject_id}")
}

/// Pointer to the most recently resolved subject.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentPointer {
    /// Subject the pointer refers to.
    pub subject_id: SubjectId,
    /// When the pointer was written.
    pub updated_at: DateTime<Utc>,
}

impl CurrentPointer {
    fn now(subject_id: &SubjectId) -> Self {
        Self {
            subject_id: subject_id.clone(),
            updated_at: Utc::now(),
        }
    }
}

/// Artifact-level view of the shared store.
#[derive(Clone)]
pub struct ArtifactRepository {
    kv: Arc<dyn KeyValueStore>,
}

impl ArtifactRepository {
    /// Wrap a key/value backend.
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Read the artifact stored for `subject_id`.
    ///
    /// An entry that no longer decodes is logged and treated as absent so
    /// the next fetch overwrites it.
    pub async fn load(&self, subject_id: &SubjectId) -> Result<Option<Artifact>> {
        let key = artifact_key(subject_id);
        let mut found = self.kv.get(std::slice::from_ref(&key)).await?;
        Ok(found.remove(&key).and_then(|v| decode(&key, v)))
    }

    /// Read the current-subject pointer.
    pub async fn current(&self) -> Result<Option<CurrentPointer>> {
        let key = CURRENT_KEY.to_string();
        let mut found = self.kv.get(std::slice::from_ref(&key)).await?;
        Ok(found.remove(&key).and_then(|v| decode(&key, v)))
    }

    /// Read the artifact the current pointer refers to, if one is stored.
    pub async fn load_current(&self) -> Result<Option<Artifact>> {
        match self.current().await? {
            Some(pointer) => self.load(&pointer.subject_id).await,
            None => Ok(None),
        }
    }

    /// Point `current` at `subject_id` without touching any artifact.
    ///
    /// A pointer that already names `subject_id` is left as written.
    pub async fn mark_current(&self, subject_id: &SubjectId) -> Result<()> {
        let mut entries = Map::new();
        self.pointer_entry(subject_id, &mut entries).await?;
        if entries.is_empty() {
            return Ok(());
        }
        self.kv.set(entries).await
    }

    /// Store `artifact` under its subject key and point `current` at it.
    ///
    /// Both entries go out in one `set`, so no reader can observe the
    /// pointer without the artifact it names. The pointer is only rewritten
    /// when it names another subject, so committing the same artifact twice
    /// leaves the store unchanged.
    pub async fn commit(&self, artifact: &Artifact) -> Result<()> {
        let mut entries = Map::new();
        let _ = entries.insert(artifact_key(&artifact.subject_id), serde_json::to_value(artifact)?);
        self.pointer_entry(&artifact.subject_id, &mut entries).await?;
        self.kv.set(entries).await?;
        debug!(
            subject_id = %artifact.subject_id,
            segments = artifact.segments.len(),
            has_summary = artifact.summary.is_some(),
            "artifact committed"
        );
        Ok(())
    }

    async fn pointer_entry(&self, subject_id: &SubjectId, entries: &mut Map<String, Value>) -> Result<()> {
        if self
            .current()
            .await?
            .is_some_and(|pointer| pointer.subject_id == *subject_id)
        {
            return Ok(());
        }
        let _ = entries.insert(
            CURRENT_KEY.to_string(),
            serde_json::to_value(CurrentPointer::now(subject_id))?,
        );
        Ok(())
    }
}

fn decode<T: serde::de::DeserializeOwned>(key: &str, value: Value) -> Option<T> {
    match serde_json::from_value(value) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(key, error = %e, "ignoring undecodable store entry");
            None
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use recap_core::{Segment, Summary};
    use serde_json::json;

    fn id(s: &str) -> SubjectId {
        SubjectId::parse(s).unwrap()
    }

    fn repo() -> (Arc<MemoryStore>, ArtifactRepository) {
        let kv = Arc::new(MemoryStore::new());
        (Arc::clone(&kv), ArtifactRepository::new(kv))
    }

    #[test]
    fn key_layout() {
        assert_eq!(artifact_key(&id("abc12345678")), "artifact:abc12345678");
    }

    #[tokio::test]
    async fn load_missing_is_none() {
        let (_, repo) = repo();
        assert!(repo.load(&id("abc12345678")).await.unwrap().is_none());
        assert!(repo.current().await.unwrap().is_none());
        assert!(repo.load_current().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn commit_writes_artifact_and_pointer_in_one_set() {
        let (kv, repo) = repo();
        let a = Artifact::new(id("abc12345678"), "T", vec![Segment::new("x", 0.0, 1.0)]);
        repo.commit(&a).await.unwrap();

        assert_eq!(kv.set_count(), 1);
        assert_eq!(repo.load(&a.subject_id).await.unwrap(), Some(a.clone()));
        assert_eq!(repo.current().await.unwrap().unwrap().subject_id, a.subject_id);
        assert_eq!(repo.load_current().await.unwrap(), Some(a));
    }

    #[tokio::test]
    async fn commit_twice_is_idempotent() {
        let (kv, repo) = repo();
        let a = Artifact::new(id("abc12345678"), "T", vec![Segment::new("x", 0.0, 1.0)])
            .with_summary(Some(Summary::plain("s")));
        repo.commit(&a).await.unwrap();
        let first = kv.snapshot();
        repo.commit(&a).await.unwrap();

        assert_eq!(kv.snapshot(), first);
        assert_eq!(kv.len(), 2);
        assert_eq!(repo.load(&a.subject_id).await.unwrap(), Some(a));
    }

    #[tokio::test]
    async fn commit_after_mark_current_keeps_pointer() {
        let (kv, repo) = repo();
        let subject = id("abc12345678");
        repo.mark_current(&subject).await.unwrap();
        let marked = repo.current().await.unwrap().unwrap();
        repo.mark_current(&subject).await.unwrap();
        repo.commit(&Artifact::new(subject.clone(), "T", vec![])).await.unwrap();

        assert_eq!(repo.current().await.unwrap(), Some(marked));
        assert_eq!(kv.set_count(), 2);
    }

    #[tokio::test]
    async fn commit_for_other_subject_moves_pointer() {
        let (_, repo) = repo();
        repo.mark_current(&id("xyz98765432")).await.unwrap();
        repo.commit(&Artifact::new(id("abc12345678"), "T", vec![]))
            .await
            .unwrap();
        assert_eq!(
            repo.current().await.unwrap().unwrap().subject_id,
            id("abc12345678")
        );
    }

    #[tokio::test]
    async fn refetch_is_last_write_wins() {
        let (_, repo) = repo();
        let old = Artifact::new(id("abc12345678"), "Old", vec![]);
        let new = Artifact::new(id("abc12345678"), "New", vec![Segment::new("y", 0.0, 1.0)]);
        repo.commit(&old).await.unwrap();
        repo.commit(&new).await.unwrap();
        assert_eq!(repo.load(&new.subject_id).await.unwrap().unwrap().title, "New");
    }

    #[tokio::test]
    async fn mark_current_without_artifact() {
        let (_, repo) = repo();
        repo.mark_current(&id("xyz98765432")).await.unwrap();
        assert_eq!(
            repo.current().await.unwrap().unwrap().subject_id,
            id("xyz98765432")
        );
        // Pointer set, artifact not yet fetched
        assert!(repo.load_current().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn undecodable_entry_is_treated_as_absent() {
        let (kv, repo) = repo();
        let mut entries = Map::new();
        let _ = entries.insert("artifact:abc12345678".into(), json!({"bogus": true}));
        kv.set(entries).await.unwrap();
        assert!(repo.load(&id("abc12345678")).await.unwrap().is_none());
    }
}
