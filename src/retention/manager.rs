use std::cmp::Ordering;
use std::fmt;

use crate::error::{ConfigError, RetentionError, StoreError};
use crate::record::{CheckpointRecord, StorageMode};
use crate::retention::score::{score_key, ScoreKey, ScoreOrder};
use crate::storage::{CheckpointStore, NullStore};

/// Configuration for the retention manager.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Retention budget. `None` keeps every eligible record; 0 keeps none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_to_keep: Option<usize>,
    /// Slash-delimited path into the metrics mapping, e.g. "eval/win_rate".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_attribute: Option<String>,
    pub score_order: ScoreOrder,
    /// Track ephemeral records under the same rules as durable ones.
    pub persist_ephemeral: bool,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        RetentionConfig {
            num_to_keep: None,
            score_attribute: None,
            score_order: ScoreOrder::Max,
            persist_ephemeral: false,
        }
    }
}

impl RetentionConfig {
    /// Validate configuration values.
    ///
    /// Validation is opt-in: the manager still degrades gracefully (retains
    /// nothing) when a zero budget reaches it unvalidated.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_to_keep == Some(0) {
            return Err(ConfigError::Validation(
                "retention.num_to_keep must be >= 1 (omit it to keep all)".into(),
            ));
        }
        if self.score_attribute.as_deref() == Some("") {
            return Err(ConfigError::Validation(
                "retention.score_attribute must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// A record currently held in the retained set.
#[derive(Debug, Clone)]
pub struct RetainedCheckpoint {
    record: CheckpointRecord,
    key: ScoreKey,
    seq: u64,
    persisted: bool,
}

impl RetainedCheckpoint {
    pub fn record(&self) -> &CheckpointRecord {
        &self.record
    }

    /// Registration sequence number (0-based, in arrival order).
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Resolved score, when the record had one.
    pub fn score(&self) -> Option<f64> {
        self.key.has_score.then_some(self.key.score)
    }

    /// Whether a persist hook was issued for this record.
    pub fn persisted(&self) -> bool {
        self.persisted
    }
}

/// Why a registered record was not retained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// Ephemeral record with `persist_ephemeral` disabled.
    Ineligible,
    /// `num_to_keep` is zero.
    ZeroBudget,
    /// Did not beat the current worst retained record.
    Displaced,
}

/// Outcome of a single `register` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    Retained,
    Discarded(DiscardReason),
}

/// Storage hook that failed during a `register` call.
///
/// Hook failures do not roll back the in-memory retained set; bookkeeping
/// and the durable side effect are allowed to diverge transiently and
/// reconciliation belongs to the collaborator.
#[derive(Debug)]
pub struct HookWarning {
    pub op: HookOp,
    pub seq: u64,
    pub error: StoreError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookOp {
    Persist,
    Delete,
}

impl fmt::Display for HookWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self.op {
            HookOp::Persist => "persist",
            HookOp::Delete => "delete",
        };
        write!(f, "{} failed for checkpoint #{}: {}", op, self.seq, self.error)
    }
}

/// What `register` did, plus any storage hook failures.
#[derive(Debug)]
pub struct RegisterReport {
    pub outcome: RegisterOutcome,
    pub warnings: Vec<HookWarning>,
}

impl RegisterReport {
    fn discarded(reason: DiscardReason) -> Self {
        RegisterReport {
            outcome: RegisterOutcome::Discarded(reason),
            warnings: Vec::new(),
        }
    }

    pub fn is_retained(&self) -> bool {
        self.outcome == RegisterOutcome::Retained
    }
}

/// Bounded best-of-N retention over a stream of checkpoint records.
///
/// Single-writer: `register` is the sole mutating entry point and performs
/// no internal locking. The retained set is exclusively owned here; queries
/// hand out shared borrows only.
pub struct RetentionManager<S: CheckpointStore = NullStore> {
    config: RetentionConfig,
    store: S,
    /// Sorted worst-to-best under the configured order.
    retained: Vec<RetainedCheckpoint>,
    next_seq: u64,
    latest_ephemeral: Option<CheckpointRecord>,
    latest_durable: Option<CheckpointRecord>,
}

impl RetentionManager<NullStore> {
    /// Manager that only tracks, with all storage hooks ignored.
    pub fn new(config: RetentionConfig) -> Self {
        Self::with_store(config, NullStore)
    }
}

impl<S: CheckpointStore> RetentionManager<S> {
    pub fn with_store(config: RetentionConfig, store: S) -> Self {
        RetentionManager {
            config,
            store,
            retained: Vec::new(),
            next_seq: 0,
            latest_ephemeral: None,
            latest_durable: None,
        }
    }

    /// Integrate one new record into the retained set.
    ///
    /// Fires at most one `persist` (for a durable record that survives
    /// insertion) and one `delete` (for the evicted entry, if it had been
    /// persisted). Hook failures come back as warnings in the report, not
    /// as `Err`; the only error case is a score attribute resolving to a
    /// non-numeric value, which leaves the retained set unchanged.
    pub fn register(
        &mut self,
        record: CheckpointRecord,
    ) -> Result<RegisterReport, RetentionError> {
        match record.storage_mode {
            StorageMode::Ephemeral => self.latest_ephemeral = Some(record.clone()),
            StorageMode::Durable => self.latest_durable = Some(record.clone()),
        }

        if record.storage_mode == StorageMode::Ephemeral && !self.config.persist_ephemeral {
            return Ok(RegisterReport::discarded(DiscardReason::Ineligible));
        }
        if self.config.num_to_keep == Some(0) {
            return Ok(RegisterReport::discarded(DiscardReason::ZeroBudget));
        }

        let mut key = score_key(&record, self.config.score_attribute.as_deref())?;
        let seq = self.next_seq;
        self.next_seq += 1;
        key.tiebreak = Some(seq);

        let order = self.config.score_order;

        // At budget and not better than the current worst: the candidate
        // never enters the set, so no persist fires and no delete can ever
        // follow.
        if let Some(limit) = self.config.num_to_keep {
            if self.retained.len() >= limit {
                match self.retained.first() {
                    Some(worst) if key.compare(&worst.key, order) == Ordering::Greater => {}
                    _ => return Ok(RegisterReport::discarded(DiscardReason::Displaced)),
                }
            }
        }

        let mut warnings = Vec::new();
        let mut entry = RetainedCheckpoint {
            record,
            key,
            seq,
            persisted: false,
        };

        if entry.record.storage_mode == StorageMode::Durable {
            if let Err(error) = self.store.persist(seq, &entry.record) {
                warnings.push(HookWarning {
                    op: HookOp::Persist,
                    seq,
                    error,
                });
            }
            // Optimistic: a failed persist still counts as issued, so the
            // eventual eviction fires the matching delete.
            entry.persisted = true;
        }

        let pos = self
            .retained
            .binary_search_by(|held| held.key.compare(&key, order))
            .unwrap_or_else(|pos| pos);
        self.retained.insert(pos, entry);

        if let Some(limit) = self.config.num_to_keep {
            if self.retained.len() > limit {
                let evicted = self.retained.remove(0);
                if evicted.persisted {
                    if let Err(error) = self.store.delete(evicted.seq, &evicted.record) {
                        warnings.push(HookWarning {
                            op: HookOp::Delete,
                            seq: evicted.seq,
                            error,
                        });
                    }
                }
            }
        }

        Ok(RegisterReport {
            outcome: RegisterOutcome::Retained,
            warnings,
        })
    }

    /// Current retained set, ordered worst-to-best.
    pub fn retained(&self) -> &[RetainedCheckpoint] {
        &self.retained
    }

    /// Best-ranked retained record, if any.
    pub fn best(&self) -> Option<&RetainedCheckpoint> {
        self.retained.last()
    }

    /// Most recently registered ephemeral record, tracked independently of
    /// the retained set (an ineligible record still updates this).
    pub fn latest_ephemeral(&self) -> Option<&CheckpointRecord> {
        self.latest_ephemeral.as_ref()
    }

    /// Most recently registered durable record.
    pub fn latest_durable(&self) -> Option<&CheckpointRecord> {
        self.latest_durable.as_ref()
    }

    pub fn config(&self) -> &RetentionConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}
