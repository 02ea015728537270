use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::record::{CheckpointPayload, CheckpointRecord};

/// Durable-storage collaborator invoked on retained-set transitions.
///
/// `persist` fires when a durable record enters the retained set, `delete`
/// when a persisted record is evicted; the manager guarantees at most one
/// call of each per record. `seq` is the manager-assigned registration
/// sequence number, unique per record.
pub trait CheckpointStore {
    fn persist(&mut self, seq: u64, record: &CheckpointRecord) -> Result<(), StoreError>;
    fn delete(&mut self, seq: u64, record: &CheckpointRecord) -> Result<(), StoreError>;
}

/// Store that ignores all hooks, for managers that only track.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStore;

impl CheckpointStore for NullStore {
    fn persist(&mut self, _seq: u64, _record: &CheckpointRecord) -> Result<(), StoreError> {
        Ok(())
    }

    fn delete(&mut self, _seq: u64, _record: &CheckpointRecord) -> Result<(), StoreError> {
        Ok(())
    }
}

/// In-memory store recording every hook invocation, for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    persisted: Vec<u64>,
    deleted: Vec<u64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Sequence numbers passed to `persist`, in call order.
    pub fn persisted(&self) -> &[u64] {
        &self.persisted
    }

    /// Sequence numbers passed to `delete`, in call order.
    pub fn deleted(&self) -> &[u64] {
        &self.deleted
    }
}

impl CheckpointStore for MemoryStore {
    fn persist(&mut self, seq: u64, _record: &CheckpointRecord) -> Result<(), StoreError> {
        self.persisted.push(seq);
        Ok(())
    }

    fn delete(&mut self, seq: u64, _record: &CheckpointRecord) -> Result<(), StoreError> {
        self.deleted.push(seq);
        Ok(())
    }
}

/// Configuration for the filesystem store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FsStoreConfig {
    pub root_dir: PathBuf,
}

impl Default for FsStoreConfig {
    fn default() -> Self {
        FsStoreConfig {
            root_dir: PathBuf::from("checkpoints"),
        }
    }
}

/// Filesystem-backed store: one numbered directory per persisted record.
///
/// The numbered directory is the store's artifact and the only thing
/// `delete` removes; a `Dir` payload's source directory belongs to the
/// producer and is referenced from metadata, never touched.
#[derive(Debug)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(config: FsStoreConfig) -> Self {
        fs::create_dir_all(&config.root_dir).ok();
        FsStore {
            root: config.root_dir,
        }
    }

    fn dir_name(seq: u64) -> String {
        format!("checkpoint_{:07}", seq)
    }

    pub fn dir_for(&self, seq: u64) -> PathBuf {
        self.root.join(Self::dir_name(seq))
    }
}

impl CheckpointStore for FsStore {
    fn persist(&mut self, seq: u64, record: &CheckpointRecord) -> Result<(), StoreError> {
        let dir_name = Self::dir_name(seq);
        let tmp_dir = self.root.join(format!("{}.tmp", dir_name));
        let final_dir = self.root.join(&dir_name);

        fs::create_dir_all(&tmp_dir)?;

        let payload_dir = match &record.payload {
            Some(CheckpointPayload::Data(data)) => {
                let payload_json = serde_json::to_string_pretty(data)?;
                fs::write(tmp_dir.join("payload.json"), payload_json)?;
                None
            }
            Some(CheckpointPayload::Dir(path)) => Some(path.clone()),
            None => None,
        };

        let metadata = serde_json::json!({
            "seq": seq,
            "storage_mode": record.storage_mode,
            "metrics": record.metrics,
            "payload_dir": payload_dir,
        });
        fs::write(
            tmp_dir.join("metadata.json"),
            serde_json::to_string_pretty(&metadata)?,
        )?;

        // Atomic rename
        if final_dir.exists() {
            fs::remove_dir_all(&final_dir)?;
        }
        fs::rename(&tmp_dir, &final_dir)?;

        Ok(())
    }

    fn delete(&mut self, seq: u64, _record: &CheckpointRecord) -> Result<(), StoreError> {
        let dir = self.dir_for(seq);
        if !dir.exists() {
            return Err(StoreError::Missing(dir));
        }
        fs::remove_dir_all(&dir)?;
        Ok(())
    }
}
