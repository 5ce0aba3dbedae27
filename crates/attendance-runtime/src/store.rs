//! Document store holding the roster and the ledger.
//!
//! The store is an opaque key/value API: each [`CollectionKey`] maps to one
//! JSON document that is read and overwritten whole. [`JsonFileStore`] keeps
//! one file per key on disk; [`MemoryStore`] keeps them in process and can be
//! told to fail, which the session tests rely on.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use serde_json::Value;
use tokio::sync::Mutex;

use attendance_core::{AttendanceError, Result};

// ── CollectionKey ─────────────────────────────────────────────────────────────

/// The documents the tracker persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKey {
    /// Array of `{name, id, class}`.
    Students,
    /// Object mapping `YYYY-MM-DD` to an array of `{name, status}`.
    Attendance,
}

impl CollectionKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Students => "students",
            Self::Attendance => "attendance",
        }
    }

    pub(crate) fn read_error(self, message: impl fmt::Display) -> AttendanceError {
        AttendanceError::StoreRead {
            key: self.as_str().to_string(),
            message: message.to_string(),
        }
    }

    fn write_error(self, message: impl fmt::Display) -> AttendanceError {
        AttendanceError::StoreWrite {
            key: self.as_str().to_string(),
            message: message.to_string(),
        }
    }
}

impl fmt::Display for CollectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── DocumentStore ─────────────────────────────────────────────────────────────

/// Whole-document persistence for one tracker instance.
///
/// Writes are last-writer-wins; implementations neither merge nor retry.
pub trait DocumentStore: Send + Sync {
    /// Current value under `key`, or `None` if nothing was ever written.
    fn load(&self, key: CollectionKey) -> impl Future<Output = Result<Option<Value>>> + Send;

    /// Replace the value under `key`.
    fn save(&self, key: CollectionKey, value: Value) -> impl Future<Output = Result<()>> + Send;
}

// ── JsonFileStore ─────────────────────────────────────────────────────────────

/// One pretty-printed JSON file per key inside a data directory.
#[derive(Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
    tmp_seq: AtomicU64,
}

impl JsonFileStore {
    /// Store rooted at `dir`. The directory is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            tmp_seq: AtomicU64::new(0),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `key`, e.g. `<dir>/students.json`.
    pub fn path_for(&self, key: CollectionKey) -> PathBuf {
        self.dir.join(format!("{}.json", key.as_str()))
    }
}

impl DocumentStore for JsonFileStore {
    async fn load(&self, key: CollectionKey) -> Result<Option<Value>> {
        let path = self.path_for(key);
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(key = %key, path = %path.display(), "no stored document");
                return Ok(None);
            }
            Err(e) => return Err(key.read_error(e)),
        };

        let value = serde_json::from_str(&text).map_err(|e| key.read_error(e))?;
        tracing::info!(key = %key, path = %path.display(), "document loaded");
        Ok(Some(value))
    }

    async fn save(&self, key: CollectionKey, value: Value) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| key.write_error(e))?;

        let text = serde_json::to_string_pretty(&value).map_err(|e| key.write_error(e))?;
        let path = self.path_for(key);
        // Concurrent saves of the same key each get their own temp file.
        let seq = self.tmp_seq.fetch_add(1, Ordering::Relaxed);
        let tmp = self.dir.join(format!(".{}.{seq}.tmp", key.as_str()));

        tokio::fs::write(&tmp, text)
            .await
            .map_err(|e| key.write_error(e))?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(key.write_error(e));
        }

        tracing::info!(key = %key, path = %path.display(), "document saved");
        Ok(())
    }
}

// ── MemoryStore ───────────────────────────────────────────────────────────────

/// In-process store with switchable failures.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: Mutex<HashMap<CollectionKey, Value>>,
    fail_loads: AtomicBool,
    fail_saves: AtomicBool,
    saves: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `load` fail (or succeed again).
    pub fn set_fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `save` fail (or succeed again).
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Seed a document without counting it as a save.
    pub async fn insert(&self, key: CollectionKey, value: Value) {
        self.documents.lock().await.insert(key, value);
    }

    /// Copy of the document under `key`.
    pub async fn get(&self, key: CollectionKey) -> Option<Value> {
        self.documents.lock().await.get(&key).cloned()
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl DocumentStore for MemoryStore {
    async fn load(&self, key: CollectionKey) -> Result<Option<Value>> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(key.read_error("store unavailable"));
        }
        Ok(self.documents.lock().await.get(&key).cloned())
    }

    async fn save(&self, key: CollectionKey, value: Value) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(key.write_error("store unavailable"));
        }
        self.documents.lock().await.insert(key, value);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
