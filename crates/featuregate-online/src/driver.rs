//! Dual-mode online store driver
//!
//! `OnlineDriver` is the polymorphic façade the host framework calls. The
//! mode is fixed at construction from deployment configuration:
//!
//! - [`DirectDriver`] executes every operation against a [`StoreBackend`]
//!   resolved once at construction (gateway process, or single-tenant local
//!   deployments).
//! - [`ProxyDriver`] resolves logical table names to physical names,
//!   serializes the arguments, and dispatches one HTTP call per operation to
//!   the gateway, attaching the cached tenant identity so the gateway can
//!   re-resolve credentials. Storage reads and writes are not available in
//!   this mode: they execute inside the gateway process.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::sync::Arc;

use featuregate_core::{
    encode_entity_key, physical_table_name, EntityKey, Error, FeatureRecord, Materializer,
    Result, RowSnapshot, StoreBackend, TenantContext, WriteRow,
};

use crate::gateway_client::GatewayClient;

/// Wire timestamp format for proxied materialize calls
const WIRE_TS_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// The operations every online store driver exposes
///
/// Table arguments are logical feature-view names; each driver resolves them
/// to tenant-scoped physical names exactly once.
#[async_trait]
pub trait OnlineDriver: Send + Sync {
    /// Upsert a batch of feature rows into one feature view's table
    async fn write_batch(&self, table: &str, rows: Vec<WriteRow>) -> Result<()>;

    /// Read the live features for each entity key, in input order
    async fn read(&self, table: &str, entity_keys: &[EntityKey])
        -> Result<Vec<Option<RowSnapshot>>>;

    /// Sync schema state: create kept tables, drop deleted ones
    ///
    /// Entity lists are accepted for interface parity but have no physical
    /// footprint in the online store.
    async fn update(
        &self,
        tables_to_delete: &[String],
        tables_to_keep: &[String],
        entities_to_delete: &[String],
        entities_to_keep: &[String],
    ) -> Result<()>;

    /// Drop all of the project's tables
    async fn teardown(&self, tables: &[String], entities: &[String]) -> Result<()>;

    /// Run a materialization job for [start, end]
    async fn materialize(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        feature_views: Option<Vec<String>>,
    ) -> Result<()>;

    /// Run an incremental materialization job up to `end`
    async fn materialize_incremental(
        &self,
        end: NaiveDateTime,
        feature_views: Option<Vec<String>>,
    ) -> Result<()>;
}

// ============================================================================
// Direct mode
// ============================================================================

/// Driver that executes against the storage backend in-process
pub struct DirectDriver {
    backend: Arc<dyn StoreBackend>,
    engine: Arc<dyn Materializer>,
    ctx: TenantContext,
}

impl DirectDriver {
    /// Create a direct driver for one tenant
    ///
    /// The backend carries the connection profile resolved at construction;
    /// it is reused for the driver's lifetime.
    pub fn new(
        backend: Arc<dyn StoreBackend>,
        engine: Arc<dyn Materializer>,
        ctx: TenantContext,
    ) -> Self {
        Self {
            backend,
            engine,
            ctx,
        }
    }

    fn physical(&self, logical: &str) -> Result<String> {
        physical_table_name(&self.ctx.project, logical)
    }

    fn resolve_all(&self, logical: &[String]) -> Result<Vec<String>> {
        logical.iter().map(|t| self.physical(t)).collect()
    }
}

#[async_trait]
impl OnlineDriver for DirectDriver {
    async fn write_batch(&self, table: &str, rows: Vec<WriteRow>) -> Result<()> {
        let physical = self.physical(table)?;
        let mut written = 0usize;

        for row in rows {
            let entity_key = encode_entity_key(&row.entity_key)?;
            for (feature_name, value) in row.values {
                self.backend
                    .upsert(
                        &physical,
                        FeatureRecord {
                            entity_key: entity_key.clone(),
                            feature_name,
                            value,
                            event_ts: row.event_ts,
                            created_ts: row.created_ts,
                        },
                    )
                    .await?;
                written += 1;
            }
        }

        tracing::debug!(
            table = %physical,
            records = written,
            "online write batch complete"
        );
        Ok(())
    }

    async fn read(
        &self,
        table: &str,
        entity_keys: &[EntityKey],
    ) -> Result<Vec<Option<RowSnapshot>>> {
        let physical = self.physical(table)?;
        let mut results = Vec::with_capacity(entity_keys.len());
        for key in entity_keys {
            let encoded = encode_entity_key(key)?;
            results.push(self.backend.read(&physical, &encoded).await?);
        }
        Ok(results)
    }

    async fn update(
        &self,
        tables_to_delete: &[String],
        tables_to_keep: &[String],
        _entities_to_delete: &[String],
        _entities_to_keep: &[String],
    ) -> Result<()> {
        self.backend
            .create_tables(&self.resolve_all(tables_to_keep)?)
            .await?;
        self.backend
            .drop_tables(&self.resolve_all(tables_to_delete)?)
            .await
    }

    async fn teardown(&self, tables: &[String], _entities: &[String]) -> Result<()> {
        self.backend.drop_tables(&self.resolve_all(tables)?).await
    }

    async fn materialize(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        feature_views: Option<Vec<String>>,
    ) -> Result<()> {
        self.engine
            .materialize(&self.ctx, start, end, feature_views)
            .await
    }

    async fn materialize_incremental(
        &self,
        end: NaiveDateTime,
        feature_views: Option<Vec<String>>,
    ) -> Result<()> {
        self.engine
            .materialize_incremental(&self.ctx, end, feature_views)
            .await
    }
}

// ============================================================================
// Proxy mode
// ============================================================================

#[derive(Debug, Serialize)]
struct InfraUpdateBody {
    project: String,
    tables_to_keep: Vec<String>,
    tables_to_delete: Vec<String>,
    entities_to_keep: Vec<String>,
    entities_to_delete: Vec<String>,
    user: Option<String>,
    offline_dataset: Option<String>,
}

#[derive(Debug, Serialize)]
struct TeardownBody {
    project: String,
    tables: Vec<String>,
    entities: Vec<String>,
    user: Option<String>,
}

#[derive(Debug, Serialize)]
struct MaterializeBody {
    project: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_date: Option<String>,
    end_date: String,
    feature_views: Option<Vec<String>>,
    user: Option<String>,
    offline_dataset: Option<String>,
}

/// Driver that proxies operations to the gateway over HTTP
pub struct ProxyDriver {
    client: GatewayClient,
    ctx: TenantContext,
}

impl ProxyDriver {
    /// Create a proxy driver for one tenant
    ///
    /// The tenant identity (user, offline dataset) is cached here and
    /// attached to every dispatched call.
    pub fn new(client: GatewayClient, ctx: TenantContext) -> Self {
        Self { client, ctx }
    }

    fn physical(&self, logical: &str) -> Result<String> {
        physical_table_name(&self.ctx.project, logical)
    }

    fn resolve_all(&self, logical: &[String]) -> Result<Vec<String>> {
        logical.iter().map(|t| self.physical(t)).collect()
    }
}

#[async_trait]
impl OnlineDriver for ProxyDriver {
    async fn write_batch(&self, _table: &str, _rows: Vec<WriteRow>) -> Result<()> {
        // Materialization writes happen inside the gateway process.
        Err(Error::ProxyUnsupported("write_batch"))
    }

    async fn read(
        &self,
        _table: &str,
        _entity_keys: &[EntityKey],
    ) -> Result<Vec<Option<RowSnapshot>>> {
        // Online reads go through the gateway's retrieval endpoint.
        Err(Error::ProxyUnsupported("read"))
    }

    async fn update(
        &self,
        tables_to_delete: &[String],
        tables_to_keep: &[String],
        entities_to_delete: &[String],
        entities_to_keep: &[String],
    ) -> Result<()> {
        let body = InfraUpdateBody {
            project: self.ctx.project.clone(),
            tables_to_keep: self.resolve_all(tables_to_keep)?,
            tables_to_delete: self.resolve_all(tables_to_delete)?,
            entities_to_keep: self.resolve_all(entities_to_keep)?,
            entities_to_delete: self.resolve_all(entities_to_delete)?,
            user: self.ctx.user.clone(),
            offline_dataset: self.ctx.offline_dataset.clone(),
        };
        self.client.post("api/v1/infra_update", &body).await
    }

    async fn teardown(&self, tables: &[String], entities: &[String]) -> Result<()> {
        let body = TeardownBody {
            project: self.ctx.project.clone(),
            tables: self.resolve_all(tables)?,
            entities: self.resolve_all(entities)?,
            user: self.ctx.user.clone(),
        };
        self.client.delete("api/v1/teardown", &body).await
    }

    async fn materialize(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        feature_views: Option<Vec<String>>,
    ) -> Result<()> {
        let body = MaterializeBody {
            project: self.ctx.project.clone(),
            start_date: Some(start.format(WIRE_TS_FORMAT).to_string()),
            end_date: end.format(WIRE_TS_FORMAT).to_string(),
            feature_views,
            user: self.ctx.user.clone(),
            offline_dataset: self.ctx.offline_dataset.clone(),
        };
        self.client.post("api/v1/materialize", &body).await
    }

    async fn materialize_incremental(
        &self,
        end: NaiveDateTime,
        feature_views: Option<Vec<String>>,
    ) -> Result<()> {
        let body = MaterializeBody {
            project: self.ctx.project.clone(),
            start_date: None,
            end_date: end.format(WIRE_TS_FORMAT).to_string(),
            feature_views,
            user: self.ctx.user.clone(),
            offline_dataset: self.ctx.offline_dataset.clone(),
        };
        self.client.post("api/v1/materialize_incr", &body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> TenantContext {
        TenantContext {
            project: "demo".to_string(),
            user: Some("alice".to_string()),
            token: None,
            offline_dataset: Some("warehouse".to_string()),
        }
    }

    #[tokio::test]
    async fn test_proxy_storage_ops_are_unavailable() {
        let client = GatewayClient::new("http://127.0.0.1:9", None).unwrap();
        let driver = ProxyDriver::new(client, ctx());

        let err = driver.write_batch("driver_stats", vec![]).await.unwrap_err();
        assert!(matches!(err, Error::ProxyUnsupported("write_batch")));

        let err = driver.read("driver_stats", &[]).await.unwrap_err();
        assert!(matches!(err, Error::ProxyUnsupported("read")));
    }

    #[test]
    fn test_materialize_body_shape() {
        let body = MaterializeBody {
            project: "demo".to_string(),
            start_date: None,
            end_date: "2024-03-01T00:00:00.000000".to_string(),
            feature_views: Some(vec!["driver_stats".to_string()]),
            user: Some("alice".to_string()),
            offline_dataset: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        // Incremental jobs omit start_date entirely.
        assert!(json.get("start_date").is_none());
        assert_eq!(json["end_date"], "2024-03-01T00:00:00.000000");
    }
}
