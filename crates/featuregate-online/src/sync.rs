//! Offline → online window sync
//!
//! `SqlMaterializer` implements the gateway's [`Materializer`] seam by
//! pulling the latest feature record per (entity key, feature name) within
//! the requested window from the tenant's offline dataset and upserting each
//! record through the storage backend.
//!
//! The offline dataset holds feature records in the same five-column shape
//! as the online tables, one source table per feature view. "Latest" is
//! picked with a ROW_NUMBER window ordered by descending event and created
//! timestamps.
//!
//! Incremental runs use the Unix epoch as the lower bound: everything up to
//! `end` that is newer than what an upsert would already have replaced.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use deadpool_postgres::Config;
use std::sync::Arc;
use std::time::Instant;
use tokio_postgres::NoTls;

use featuregate_core::{
    naming, physical_table_name, ConnectionProfile, Error, FeatureRecord, FeatureValue,
    Materializer, Result, StoreBackend, TenantContext,
};

/// Window-sync materialization engine backed by a relational offline store
pub struct SqlMaterializer {
    offline: Option<ConnectionProfile>,
    backend: Arc<dyn StoreBackend>,
}

impl SqlMaterializer {
    /// Create an engine over the configured offline profile
    ///
    /// `offline` may be absent; materialization then fails with a
    /// configuration error at request time rather than at startup, since
    /// infra and retrieval endpoints remain fully usable without it.
    pub fn new(offline: Option<ConnectionProfile>, backend: Arc<dyn StoreBackend>) -> Self {
        Self { offline, backend }
    }

    /// Resolve the offline profile for one run
    ///
    /// The tenant's `offline_dataset` selects the database within the
    /// configured offline store; without it the profile's own database is
    /// used.
    fn offline_profile(&self, ctx: &TenantContext) -> Result<ConnectionProfile> {
        let profile = self
            .offline
            .as_ref()
            .ok_or_else(|| Error::config("offline store is not configured"))?;
        Ok(match &ctx.offline_dataset {
            Some(dataset) => profile.with_database(dataset.clone()),
            None => profile.clone(),
        })
    }

    async fn sync_view(
        &self,
        pool: &deadpool_postgres::Pool,
        ctx: &TenantContext,
        view: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<usize> {
        naming::validate_identifier(view)?;
        let target = physical_table_name(&ctx.project, view)?;

        let conn = pool
            .get()
            .await
            .map_err(|e| Error::Backend(anyhow::anyhow!("offline pool get error: {}", e)))?;

        // Latest record per identity within the window.
        let sql = format!(
            r#"
            SELECT entity_key, feature_name, value, event_ts, created_ts
            FROM (
                SELECT entity_key, feature_name, value, event_ts, created_ts,
                       ROW_NUMBER() OVER (
                           PARTITION BY entity_key, feature_name
                           ORDER BY event_ts DESC, created_ts DESC NULLS LAST
                       ) AS row_num
                FROM {view}
                WHERE event_ts BETWEEN $1 AND $2
            ) ranked
            WHERE row_num = 1
            "#,
        );

        let rows = conn
            .query(&sql, &[&start, &end])
            .await
            .map_err(|e| Error::Backend(anyhow::anyhow!("offline scan of '{}': {}", view, e)))?;

        let mut synced = 0usize;
        for row in rows {
            let blob: Vec<u8> = row.get(2);
            let record = FeatureRecord {
                entity_key: row.get(0),
                feature_name: row.get(1),
                value: FeatureValue::from_blob(&blob)?,
                event_ts: row.get(3),
                created_ts: row.get(4),
            };
            self.backend.upsert(&target, record).await?;
            synced += 1;
        }

        Ok(synced)
    }

    async fn run(
        &self,
        ctx: &TenantContext,
        start: NaiveDateTime,
        end: NaiveDateTime,
        feature_views: Option<Vec<String>>,
        mode: &'static str,
    ) -> Result<()> {
        let views = match feature_views {
            Some(views) if !views.is_empty() => views,
            _ => {
                return Err(Error::validation(
                    "feature_views must name at least one view",
                ))
            }
        };

        let profile = self.offline_profile(ctx)?;
        let mut pg_config = Config::new();
        pg_config.host = Some(profile.host.clone());
        pg_config.port = Some(profile.port);
        pg_config.user = Some(profile.user.clone());
        pg_config.password = Some(profile.password.clone());
        pg_config.dbname = Some(profile.database.clone());

        let pool = pg_config
            .builder(NoTls)
            .map_err(|e| Error::Backend(anyhow::anyhow!("offline pool builder error: {}", e)))?
            .max_size(2)
            .build()
            .map_err(|e| Error::Backend(anyhow::anyhow!("offline pool creation error: {}", e)))?;

        let started = Instant::now();
        let mut total = 0usize;
        for view in &views {
            total += self.sync_view(&pool, ctx, view, start, end).await?;
        }

        tracing::info!(
            project = %ctx.project,
            views = views.len(),
            records = total,
            duration_ms = started.elapsed().as_millis() as u64,
            mode = mode,
            "materialization complete"
        );
        Ok(())
    }
}

#[async_trait]
impl Materializer for SqlMaterializer {
    async fn materialize(
        &self,
        ctx: &TenantContext,
        start: NaiveDateTime,
        end: NaiveDateTime,
        feature_views: Option<Vec<String>>,
    ) -> Result<()> {
        self.run(ctx, start, end, feature_views, "window").await
    }

    async fn materialize_incremental(
        &self,
        ctx: &TenantContext,
        end: NaiveDateTime,
        feature_views: Option<Vec<String>>,
    ) -> Result<()> {
        let start = DateTime::<Utc>::UNIX_EPOCH.naive_utc();
        self.run(ctx, start, end, feature_views, "incremental").await
    }
}
