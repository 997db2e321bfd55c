//! In-memory storage backend
//!
//! Holds feature tables in process memory behind an `RwLock`. This is the
//! default backend for local development and the integration test suite; it
//! mirrors the relational backend's semantics, including errors on reads
//! against missing tables.
//!
//! Values are stored as the same JSON blobs the relational backend persists,
//! so the encode/decode path is exercised even without a database.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use featuregate_core::{Error, FeatureRecord, FeatureValue, Result, RowSnapshot, StoreBackend};

#[derive(Debug, Clone)]
struct StoredRecord {
    value_blob: Vec<u8>,
    event_ts: NaiveDateTime,
    #[allow(dead_code)] // kept to mirror the persisted column set
    created_ts: Option<NaiveDateTime>,
}

/// In-process table map: table name → (entity_key, feature_name) → record
///
/// The inner `BTreeMap` gives a deterministic scan order (by entity key,
/// then feature name), which pins down the "timestamp of the last row
/// scanned" read semantics.
type Tables = HashMap<String, BTreeMap<(String, String), StoredRecord>>;

/// In-memory online store
#[derive(Debug, Default)]
pub struct MemoryBackend {
    tables: RwLock<Tables>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of all existing tables (test helper)
    pub fn table_names(&self) -> Vec<String> {
        let tables = self.tables.read().expect("memory backend poisoned");
        let mut names: Vec<String> = tables.keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl StoreBackend for MemoryBackend {
    async fn create_tables(&self, tables: &[String]) -> Result<()> {
        let mut state = self.tables.write().expect("memory backend poisoned");
        for table in tables {
            state.entry(table.clone()).or_default();
            tracing::debug!(table = %table, "memory table ensured");
        }
        Ok(())
    }

    async fn drop_tables(&self, tables: &[String]) -> Result<()> {
        let mut state = self.tables.write().expect("memory backend poisoned");
        for table in tables {
            state.remove(table);
            tracing::debug!(table = %table, "memory table dropped");
        }
        Ok(())
    }

    async fn upsert(&self, table: &str, record: FeatureRecord) -> Result<()> {
        let mut state = self.tables.write().expect("memory backend poisoned");
        let rows = state
            .get_mut(table)
            .ok_or_else(|| Error::backend_msg(format!("table '{table}' does not exist")))?;

        rows.insert(
            (record.entity_key, record.feature_name),
            StoredRecord {
                value_blob: record.value.to_blob()?,
                event_ts: record.event_ts,
                created_ts: record.created_ts,
            },
        );
        Ok(())
    }

    async fn read(&self, table: &str, entity_key: &str) -> Result<Option<RowSnapshot>> {
        let state = self.tables.read().expect("memory backend poisoned");
        let rows = state
            .get(table)
            .ok_or_else(|| Error::backend_msg(format!("table '{table}' does not exist")))?;

        let mut features = HashMap::new();
        let mut last_ts = None;
        for ((key, feature_name), record) in rows {
            if key != entity_key {
                continue;
            }
            features.insert(
                feature_name.clone(),
                FeatureValue::from_blob(&record.value_blob)?,
            );
            last_ts = Some(record.event_ts);
        }

        if features.is_empty() {
            return Ok(None);
        }
        Ok(Some(RowSnapshot {
            event_ts: last_ts,
            features,
        }))
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(secs: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(12, 0, secs)
            .unwrap()
    }

    fn record(key: &str, feature: &str, value: i64, secs: u32) -> FeatureRecord {
        FeatureRecord {
            entity_key: key.to_string(),
            feature_name: feature.to_string(),
            value: FeatureValue::Int(value),
            event_ts: ts(secs),
            created_ts: None,
        }
    }

    #[tokio::test]
    async fn test_create_is_idempotent() {
        let backend = MemoryBackend::new();
        let tables = vec!["demo_driver_stats".to_string()];
        backend.create_tables(&tables).await.unwrap();
        backend
            .upsert("demo_driver_stats", record("ek1", "rating", 5, 0))
            .await
            .unwrap();

        // Second create must not wipe the row
        backend.create_tables(&tables).await.unwrap();
        let snapshot = backend.read("demo_driver_stats", "ek1").await.unwrap();
        assert!(snapshot.is_some());
    }

    #[tokio::test]
    async fn test_upsert_leaves_single_record() {
        let backend = MemoryBackend::new();
        backend
            .create_tables(&["t".to_string()])
            .await
            .unwrap();
        backend.upsert("t", record("ek1", "rating", 1, 0)).await.unwrap();
        backend.upsert("t", record("ek1", "rating", 2, 5)).await.unwrap();

        let snapshot = backend.read("t", "ek1").await.unwrap().unwrap();
        assert_eq!(snapshot.features.len(), 1);
        assert_eq!(snapshot.features["rating"], FeatureValue::Int(2));
        assert_eq!(snapshot.event_ts, Some(ts(5)));
    }

    #[tokio::test]
    async fn test_read_missing_key_is_none() {
        let backend = MemoryBackend::new();
        backend.create_tables(&["t".to_string()]).await.unwrap();
        assert!(backend.read("t", "nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_read_missing_table_is_error() {
        let backend = MemoryBackend::new();
        assert!(backend.read("ghost", "ek1").await.is_err());
    }

    #[tokio::test]
    async fn test_upsert_missing_table_is_error() {
        let backend = MemoryBackend::new();
        assert!(backend.upsert("ghost", record("ek1", "f", 1, 0)).await.is_err());
    }

    #[tokio::test]
    async fn test_read_timestamp_is_last_row_scanned() {
        // Rows scan in feature-name order, so the returned timestamp is the
        // last feature's, not the maximum.
        let backend = MemoryBackend::new();
        backend.create_tables(&["t".to_string()]).await.unwrap();
        backend.upsert("t", record("ek1", "a_feature", 1, 30)).await.unwrap();
        backend.upsert("t", record("ek1", "z_feature", 2, 10)).await.unwrap();

        let snapshot = backend.read("t", "ek1").await.unwrap().unwrap();
        assert_eq!(snapshot.event_ts, Some(ts(10)));
    }

    #[tokio::test]
    async fn test_drop_is_idempotent() {
        let backend = MemoryBackend::new();
        backend.create_tables(&["t".to_string()]).await.unwrap();
        backend.drop_tables(&["t".to_string()]).await.unwrap();
        backend.drop_tables(&["t".to_string()]).await.unwrap();
        assert!(backend.read("t", "ek1").await.is_err());
    }
}
