//! Storage backend and materialization engine traits
//!
//! `StoreBackend` is the seam between the gateway/drivers and the relational
//! store that holds online feature tables. `Materializer` is the seam to the
//! batch engine that copies features from the offline store into the online
//! store.
//!
//! ## Key Design Decisions
//!
//! 1. **Physical names only**: backends take fully-resolved table names; the
//!    schema namer runs in the driver or gateway, never here
//! 2. **Atomic upserts**: `upsert` must be a single conflict-resolving
//!    statement, never a read-modify-write sequence
//! 3. **Short-lived connections**: each operation acquires and releases its
//!    own connection; no pooling invariant is assumed across calls

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::session::TenantContext;
use crate::{FeatureRecord, Result, RowSnapshot};

/// Trait for online feature storage backends
///
/// Implementations must be thread-safe (`Send + Sync`): the gateway shares
/// one backend across concurrent requests.
#[async_trait]
pub trait StoreBackend: Send + Sync {
    /// Create the given tables if they do not exist
    ///
    /// Idempotent: calling twice for the same table never errors and never
    /// drops data. Each table gets the five-column feature schema with
    /// primary key (entity_key, feature_name).
    async fn create_tables(&self, tables: &[String]) -> Result<()>;

    /// Drop the given tables if they exist
    ///
    /// Idempotent: a missing table is a no-op.
    async fn drop_tables(&self, tables: &[String]) -> Result<()>;

    /// Upsert one feature record
    ///
    /// Exactly one live record survives per (entity_key, feature_name); a
    /// second write with the same identity replaces value and timestamps.
    async fn upsert(&self, table: &str, record: FeatureRecord) -> Result<()>;

    /// Read all live features for one storage key
    ///
    /// Returns `Ok(None)` when the key has no rows. A missing table is a
    /// backend error, not an empty result. The snapshot's `event_ts` is the
    /// timestamp of the last row scanned.
    async fn read(&self, table: &str, entity_key: &str) -> Result<Option<RowSnapshot>>;

    /// Check that the backend can serve requests
    async fn health_check(&self) -> Result<()>;

    /// Backend name for logging
    fn backend_type(&self) -> &'static str;
}

/// Trait for the batch materialization engine
///
/// The gateway owns the endpoints; the engine owns the copy. Implementations
/// scope every run to the tenant context they are handed — tenant state is
/// never read from process globals.
#[async_trait]
pub trait Materializer: Send + Sync {
    /// Copy features for [start, end] into the online store
    async fn materialize(
        &self,
        ctx: &TenantContext,
        start: NaiveDateTime,
        end: NaiveDateTime,
        feature_views: Option<Vec<String>>,
    ) -> Result<()>;

    /// Copy all features up to `end` into the online store
    async fn materialize_incremental(
        &self,
        ctx: &TenantContext,
        end: NaiveDateTime,
        feature_views: Option<Vec<String>>,
    ) -> Result<()>;
}
