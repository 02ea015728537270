use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::RetentionError;
use crate::record::CheckpointRecord;

/// Which end of the score range is "best".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreOrder {
    /// Lower scores are better.
    Min,
    /// Higher scores are better.
    #[default]
    Max,
}

/// Totally ordered sort key derived from a record.
///
/// `score` holds the raw resolved value; the order direction is applied at
/// comparison time. An unscored key sorts below any scored key regardless of
/// order. `tiebreak` is `None` from pure extraction; the manager fills in
/// the registration sequence number on insertion, and among otherwise equal
/// keys a later registration ranks better.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreKey {
    pub has_score: bool,
    pub score: f64,
    pub tiebreak: Option<u64>,
}

impl ScoreKey {
    pub fn unscored() -> Self {
        ScoreKey {
            has_score: false,
            score: 0.0,
            tiebreak: None,
        }
    }

    fn directed(&self, order: ScoreOrder) -> f64 {
        match order {
            ScoreOrder::Max => self.score,
            ScoreOrder::Min => -self.score,
        }
    }

    /// Total order under `order`: `Greater` means better.
    pub fn compare(&self, other: &ScoreKey, order: ScoreOrder) -> Ordering {
        self.has_score
            .cmp(&other.has_score)
            .then(
                self.directed(order)
                    .partial_cmp(&other.directed(order))
                    .unwrap_or(Ordering::Equal),
            )
            .then(self.tiebreak.cmp(&other.tiebreak))
    }
}

/// Compute the sort key for a record under the configured score attribute.
///
/// An unset attribute or a path missing from the metrics (at any segment)
/// yields an unscored key; a path that resolves to a non-numeric value is a
/// data error. Pure function of (record, path).
pub fn score_key(
    record: &CheckpointRecord,
    score_attribute: Option<&str>,
) -> Result<ScoreKey, RetentionError> {
    let Some(path) = score_attribute else {
        return Ok(ScoreKey::unscored());
    };

    let segments: Vec<&str> = path.split('/').collect();
    let Some(value) = resolve(&record.metrics, &segments) else {
        return Ok(ScoreKey::unscored());
    };

    match value {
        Value::Number(n) => match n.as_f64() {
            Some(v) if !v.is_nan() => Ok(ScoreKey {
                has_score: true,
                score: v,
                tiebreak: None,
            }),
            _ => Ok(ScoreKey::unscored()),
        },
        other => Err(RetentionError::ScoreNotNumeric {
            path: path.to_string(),
            found: value_kind(other),
        }),
    }
}

/// Resolve path segments against a mapping that may mix nested mappings and
/// flattened slash-joined keys at any level.
///
/// Longest literal prefix first: a flattened key may contain the delimiter,
/// so the whole joined suffix is tried as a key before descending one
/// segment at a time. `{"a": {"b": {"c": 5}}}`, `{"a": {"b/c": 5}}`,
/// `{"a/b": {"c": 5}}`, and `{"a/b/c": 5}` all resolve `"a/b/c"` to 5.
fn resolve<'a>(map: &'a Map<String, Value>, segments: &[&str]) -> Option<&'a Value> {
    for split in (1..=segments.len()).rev() {
        let key = segments[..split].join("/");
        match map.get(key.as_str()) {
            Some(value) if split == segments.len() => return Some(value),
            Some(Value::Object(inner)) => {
                if let Some(found) = resolve(inner, &segments[split..]) {
                    return Some(found);
                }
            }
            _ => {}
        }
    }
    None
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "a mapping",
    }
}
