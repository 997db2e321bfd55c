//! Core data types for FeatureGate
//!
//! This module defines the fundamental data structures used throughout the
//! system. These types are kept simple and focused on their single
//! responsibility.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{Error, Result};

/// A typed scalar usable as an entity key component
///
/// Only types with a stable, unambiguous byte representation are allowed in
/// keys. Floats and nulls are rejected by the key codec rather than silently
/// stringified.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum KeyValue {
    /// Integer identifier (driver IDs, account numbers)
    Int(i64),
    /// String identifier (UUIDs, usernames)
    String(String),
    /// Boolean flag key component (rare, but representable)
    Bool(bool),
    /// Raw bytes
    Bytes(Vec<u8>),
}

impl KeyValue {
    /// Short type label used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            KeyValue::Int(_) => "int",
            KeyValue::String(_) => "string",
            KeyValue::Bool(_) => "bool",
            KeyValue::Bytes(_) => "bytes",
        }
    }
}

impl From<i64> for KeyValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<&str> for KeyValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for KeyValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

/// Composite entity key: an ordered sequence of (join key, value) pairs
///
/// The order of pairs is caller-defined and preserved: the key codec never
/// sorts or normalizes, so identical pairs in identical order always encode
/// to identical storage keys.
///
/// # Examples
///
/// ```
/// use featuregate_core::{EntityKey, KeyValue};
///
/// let key = EntityKey::new(vec![("driver_id".to_string(), KeyValue::Int(1001))]);
/// assert_eq!(key.pairs().len(), 1);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct EntityKey {
    pairs: Vec<(String, KeyValue)>,
}

impl EntityKey {
    /// Creates an entity key from ordered (join key, value) pairs
    pub fn new(pairs: Vec<(String, KeyValue)>) -> Self {
        Self { pairs }
    }

    /// Single-component key convenience constructor
    pub fn single(name: impl Into<String>, value: impl Into<KeyValue>) -> Self {
        Self {
            pairs: vec![(name.into(), value.into())],
        }
    }

    /// The ordered (join key, value) pairs
    pub fn pairs(&self) -> &[(String, KeyValue)] {
        &self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// A feature value as stored and served
///
/// Values round-trip through JSON for BLOB storage, so every variant must
/// serialize unambiguously.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FeatureValue {
    Int(i64),
    Float(f64),
    String(String),
    Bool(bool),
    Null,
}

impl FeatureValue {
    /// Serialize to the BLOB representation used by storage backends
    pub fn to_blob(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode from the BLOB representation
    pub fn from_blob(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// One upsert-able record: the storage identity is (entity_key, feature_name)
///
/// `entity_key` is the hex storage key produced by the key codec, not the
/// raw composite key.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRecord {
    pub entity_key: String,
    pub feature_name: String,
    pub value: FeatureValue,
    pub event_ts: NaiveDateTime,
    pub created_ts: Option<NaiveDateTime>,
}

/// A batch-write row: one entity instance with all its feature values
#[derive(Debug, Clone)]
pub struct WriteRow {
    pub entity_key: EntityKey,
    pub values: HashMap<String, FeatureValue>,
    pub event_ts: NaiveDateTime,
    pub created_ts: Option<NaiveDateTime>,
}

/// The result of a point read: all live features for one entity key
///
/// `event_ts` is the timestamp of the last row the backend scanned for the
/// key — not necessarily the maximum across features. Tests pin this down;
/// callers that need a true maximum must compute it themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct RowSnapshot {
    pub event_ts: Option<NaiveDateTime>,
    pub features: HashMap<String, FeatureValue>,
}

/// A parsed feature reference of the form `view:feature`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FeatureRef {
    pub view: String,
    pub feature: String,
}

impl FeatureRef {
    /// Parse a `view:feature` reference
    ///
    /// Both halves must be non-empty; anything else is a validation error.
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.split_once(':') {
            Some((view, feature)) if !view.is_empty() && !feature.is_empty() => Ok(Self {
                view: view.to_string(),
                feature: feature.to_string(),
            }),
            _ => Err(Error::validation(format!(
                "invalid feature reference '{raw}', expected 'view:feature'"
            ))),
        }
    }

    /// Output name under the full-feature-names flag
    pub fn full_name(&self) -> String {
        format!("{}__{}", self.view, self.feature)
    }
}

/// Normalize a timezone-aware timestamp to naive UTC
pub fn to_naive_utc(ts: DateTime<FixedOffset>) -> NaiveDateTime {
    ts.with_timezone(&Utc).naive_utc()
}

/// Parse a wire timestamp into naive UTC
///
/// Timezone-aware timestamps (RFC 3339 with offset) are converted to UTC and
/// stripped of the offset; naive timestamps pass through unchanged.
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime> {
    if let Ok(aware) = DateTime::parse_from_rfc3339(raw) {
        return Ok(to_naive_utc(aware));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(naive);
        }
    }
    Err(Error::validation(format!("invalid timestamp '{raw}'")))
}
