use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Where a checkpoint's payload lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    /// Payload exists only in process memory.
    Ephemeral,
    /// Payload is written to durable storage when the record is retained.
    Durable,
}

/// Opaque reference to checkpoint data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckpointPayload {
    /// An already-materialized checkpoint directory.
    Dir(PathBuf),
    /// An in-process blob.
    Data(Value),
}

/// One observed checkpoint: payload reference, storage mode, metrics snapshot.
///
/// Immutable once created. Records carry no identity; retention compares
/// them only by derived score. A metrics-only record (no payload) is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<CheckpointPayload>,
    pub storage_mode: StorageMode,
    /// String keys mapping to scalars or nested mappings of arbitrary depth.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metrics: Map<String, Value>,
}

impl CheckpointRecord {
    pub fn new(payload: Option<CheckpointPayload>, storage_mode: StorageMode) -> Self {
        CheckpointRecord {
            payload,
            storage_mode,
            metrics: Map::new(),
        }
    }

    pub fn with_metrics(mut self, metrics: Map<String, Value>) -> Self {
        self.metrics = metrics;
        self
    }
}
