//! JSON-file [`KeyValueStore`] shared between processes.
//!
//! The whole store is one JSON object on disk. Reads re-read the file so
//! writes made by another process are picked up. Each write holds an
//! exclusive `flock` on a sibling `.lock` file for the whole
//! read-merge-write, then replaces the store through a uniquely named temp
//! file in the same directory, so a reader never sees a half-written file
//! and concurrent writers never drop each other's keys.

use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rustix::fs::{FlockOperation, flock};
use serde_json::{Map, Value};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::errors::{Result, StoreError};
use crate::kv::KeyValueStore;

/// File-backed store.
///
/// Handles are independent: any number of them, in any number of
/// processes, may point at the same file.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Open (lazily) a store at `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Advisory lock file guarding writers of `path`.
    pub fn lock_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map_or_else(|| OsString::from("store"), OsString::from);
        name.push(".lock");
        self.path.with_file_name(name)
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Path) -> Result<T> + Send + 'static,
    {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || f(&path))
            .await
            .map_err(|e| io_error(&self.path, std::io::Error::other(e)))?
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn parent_dir(path: &Path) -> &Path {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

fn read_map(path: &Path) -> Result<Map<String, Value>> {
    let raw = match std::fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
        Err(source) => return Err(io_error(path, source)),
    };
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    match serde_json::from_slice::<Value>(&raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(StoreError::Corrupt {
            path: path.display().to_string(),
            message: format!("expected object, found {}", type_name(&other)),
        }),
        Err(e) => Err(StoreError::Corrupt {
            path: path.display().to_string(),
            message: e.to_string(),
        }),
    }
}

fn write_map(path: &Path, map: &Map<String, Value>) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(map)?;
    let mut tmp = NamedTempFile::new_in(parent_dir(path)).map_err(|e| io_error(path, e))?;
    tmp.write_all(&bytes).map_err(|e| io_error(path, e))?;
    tmp.as_file().sync_all().map_err(|e| io_error(path, e))?;
    let _ = tmp.persist(path).map_err(|e| io_error(path, e.error))?;
    Ok(())
}

/// Hold an exclusive advisory lock on `lock_path` until the file is dropped.
fn lock_exclusive(path: &Path, lock_path: &Path) -> Result<File> {
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(lock_path)
        .map_err(|e| io_error(path, e))?;
    flock(&file, FlockOperation::LockExclusive).map_err(|e| io_error(path, e.into()))?;
    Ok(file)
}

fn merge_into_file(path: &Path, lock_path: &Path, entries: Map<String, Value>) -> Result<()> {
    std::fs::create_dir_all(parent_dir(path)).map_err(|e| io_error(path, e))?;
    let _lock = lock_exclusive(path, lock_path)?;
    let mut all = read_map(path)?;
    for (k, v) in entries {
        let _ = all.insert(k, v);
    }
    write_map(path, &all)
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, keys: &[String]) -> Result<Map<String, Value>> {
        let mut all = self.blocking(read_map).await?;
        Ok(keys
            .iter()
            .filter_map(|k| all.remove(k).map(|v| (k.clone(), v)))
            .collect())
    }

    async fn set(&self, entries: Map<String, Value>) -> Result<()> {
        let count = entries.len();
        let lock_path = self.lock_path();
        self.blocking(move |path| merge_into_file(path, &lock_path, entries))
            .await?;
        debug!(path = %self.path.display(), count, "store entries written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn one(k: &str, v: Value) -> Map<String, Value> {
        let mut m = Map::new();
        let _ = m.insert(k.to_string(), v);
        m
    }

    #[tokio::test]
    async fn missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("store.json"));
        assert!(store.get(&["a".into()]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn set_then_get_roundtrips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");
        let store = JsonFileStore::new(&path);
        store.set(one("a", json!({"x": 1}))).await.unwrap();
        store.set(one("b", json!(2))).await.unwrap();

        // A second handle on the same file sees both writes
        let other = JsonFileStore::new(&path);
        let got = other.get(&["a".into(), "b".into()]).await.unwrap();
        assert_eq!(got["a"]["x"], 1);
        assert_eq!(got["b"], 2);
        let leftovers: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .filter(|name| name != "store.json" && name != "store.json.lock")
            .collect();
        assert!(leftovers.is_empty(), "stray files: {leftovers:?}");
    }

    #[tokio::test]
    async fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "[1, 2]").unwrap();
        let store = JsonFileStore::new(&path);
        assert_matches!(
            store.get(&["a".into()]).await,
            Err(StoreError::Corrupt { .. })
        );
    }

    #[tokio::test]
    async fn concurrent_sets_in_process_are_not_lost() {
        let dir = tempfile::tempdir().unwrap();
        let store = std::sync::Arc::new(JsonFileStore::new(dir.path().join("s.json")));
        let mut handles = Vec::new();
        for i in 0..8 {
            let store = std::sync::Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.set(one(&format!("k{i}"), json!(i))).await.unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        let keys: Vec<String> = (0..8).map(|i| format!("k{i}")).collect();
        assert_eq!(store.get(&keys).await.unwrap().len(), 8);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn independent_handles_writing_at_once_keep_every_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let mut handles = Vec::new();
        for i in 0..16 {
            let store = JsonFileStore::new(&path);
            handles.push(tokio::spawn(async move {
                store
                    .set(one(&format!("artifact:{i}"), json!({"n": i})))
                    .await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }
        let keys: Vec<String> = (0..16).map(|i| format!("artifact:{i}")).collect();
        let got = JsonFileStore::new(&path).get(&keys).await.unwrap();
        assert_eq!(got.len(), 16);
        assert_eq!(got["artifact:7"]["n"], 7);
    }

    #[test]
    fn lock_file_sits_next_to_store() {
        let store = JsonFileStore::new("/data/recap/store.json");
        assert_eq!(store.lock_path(), Path::new("/data/recap/store.json.lock"));
    }
}
