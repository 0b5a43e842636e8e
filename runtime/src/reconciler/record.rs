//! Persisted local version record.
//!
//! Lives outside the cache so it survives eviction. Written only after a
//! successful reconciliation; concurrent tabs race last-writer-wins.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use spin::Mutex;

use crate::error::RecordError;
use crate::version::VersionDescriptor;

/// What this client believes it is running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalVersionRecord {
    pub version: String,
    pub build_timestamp: u64,
    pub updated_at: DateTime<Utc>,
}

impl LocalVersionRecord {
    pub fn new(version: impl Into<String>, build_timestamp: u64) -> Self {
        Self {
            version: version.into(),
            build_timestamp,
            updated_at: Utc::now(),
        }
    }

    /// Record for an adopted or applied deployment, stamped now.
    pub fn from_descriptor(descriptor: &VersionDescriptor) -> Self {
        Self::new(descriptor.version.clone(), descriptor.build_timestamp)
    }
}

/// Storage for the single local record.
#[async_trait]
pub trait VersionRecordStore: Send + Sync {
    /// `Ok(None)` when nothing was recorded yet.
    async fn load(&self) -> Result<Option<LocalVersionRecord>, RecordError>;

    async fn save(&self, record: &LocalVersionRecord) -> Result<(), RecordError>;
}

/// In-memory record store.
#[derive(Default)]
pub struct MemoryRecordStore {
    record: Mutex<Option<LocalVersionRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(record: LocalVersionRecord) -> Self {
        Self {
            record: Mutex::new(Some(record)),
        }
    }

    pub fn get(&self) -> Option<LocalVersionRecord> {
        self.record.lock().clone()
    }
}

#[async_trait]
impl VersionRecordStore for MemoryRecordStore {
    async fn load(&self) -> Result<Option<LocalVersionRecord>, RecordError> {
        Ok(self.get())
    }

    async fn save(&self, record: &LocalVersionRecord) -> Result<(), RecordError> {
        *self.record.lock() = Some(record.clone());
        Ok(())
    }
}

/// JSON file record store.
pub struct FileRecordStore {
    path: PathBuf,
    writes: AtomicU64,
}

impl FileRecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writes: AtomicU64::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Unique sibling temp path, so concurrent writers never share one.
    fn tmp_path(&self) -> PathBuf {
        let n = self.writes.fetch_add(1, Ordering::SeqCst);
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "version-record.json".into());
        name.push(format!(".{}.{}.tmp", std::process::id(), n));
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl VersionRecordStore for FileRecordStore {
    async fn load(&self) -> Result<Option<LocalVersionRecord>, RecordError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write to a temp file first, then rename over the record.
    async fn save(&self, record: &LocalVersionRecord) -> Result<(), RecordError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }
        let tmp = self.tmp_path();
        let json = serde_json::to_vec_pretty(record)?;
        tokio::fs::write(&tmp, json).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        log::trace!(
            "[Reconciler] recorded {} ({}) at {}",
            record.version,
            record.build_timestamp,
            self.path.display()
        );
        Ok(())
    }
}
