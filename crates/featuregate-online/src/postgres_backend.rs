//! PostgreSQL storage backend
//!
//! Executes the online-store CRUD against PostgreSQL using a per-tenant
//! connection profile resolved at construction.
//!
//! ## Table Schema
//!
//! One table per (project, feature view), created on demand:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS {project}_{view} (
//!     entity_key   VARCHAR(512) NOT NULL,
//!     feature_name VARCHAR(256) NOT NULL,
//!     value        BYTEA,
//!     event_ts     TIMESTAMP,
//!     created_ts   TIMESTAMP,
//!     PRIMARY KEY (entity_key, feature_name)
//! );
//! ```
//!
//! Upserts are a single `INSERT .. ON CONFLICT DO UPDATE` statement, so
//! concurrent writers to the same identity cannot interleave a lost update.

use async_trait::async_trait;
use deadpool_postgres::{Config, Pool};
use std::collections::HashMap;
use tokio_postgres::NoTls;

use featuregate_core::{
    naming, ConnectionProfile, Error, FeatureRecord, FeatureValue, Result, RowSnapshot,
    StoreBackend,
};

/// Default connection pool size per backend instance
const DEFAULT_POOL_SIZE: usize = 4;

/// PostgreSQL online store backend
pub struct PostgresBackend {
    pool: Pool,
}

impl PostgresBackend {
    /// Create a backend for one connection profile
    ///
    /// Connections are pooled per backend instance and acquired per
    /// operation; nothing is held across calls.
    pub fn new(profile: &ConnectionProfile) -> Result<Self> {
        Self::with_pool_size(profile, DEFAULT_POOL_SIZE)
    }

    pub fn with_pool_size(profile: &ConnectionProfile, pool_size: usize) -> Result<Self> {
        let mut pg_config = Config::new();
        pg_config.host = Some(profile.host.clone());
        pg_config.port = Some(profile.port);
        pg_config.user = Some(profile.user.clone());
        pg_config.password = Some(profile.password.clone());
        pg_config.dbname = Some(profile.database.clone());

        let pool = pg_config
            .builder(NoTls)
            .map_err(|e| Error::Backend(anyhow::anyhow!("pool builder error: {}", e)))?
            .max_size(pool_size)
            .build()
            .map_err(|e| Error::Backend(anyhow::anyhow!("pool creation error: {}", e)))?;

        Ok(Self { pool })
    }

    async fn conn(&self) -> Result<deadpool_postgres::Object> {
        self.pool
            .get()
            .await
            .map_err(|e| Error::Backend(anyhow::anyhow!("pool get error: {}", e)))
    }
}

#[async_trait]
impl StoreBackend for PostgresBackend {
    async fn create_tables(&self, tables: &[String]) -> Result<()> {
        for table in tables {
            naming::validate_identifier(table)?;
        }
        let conn = self.conn().await?;
        for table in tables {
            conn.batch_execute(&format!(
                r#"
                CREATE TABLE IF NOT EXISTS {table} (
                    entity_key   VARCHAR(512) NOT NULL,
                    feature_name VARCHAR(256) NOT NULL,
                    value        BYTEA,
                    event_ts     TIMESTAMP,
                    created_ts   TIMESTAMP,
                    PRIMARY KEY (entity_key, feature_name)
                )
                "#,
            ))
            .await
            .map_err(|e| Error::Backend(anyhow::anyhow!("create table '{}': {}", table, e)))?;

            tracing::info!(table = %table, "online table ensured");
        }
        Ok(())
    }

    async fn drop_tables(&self, tables: &[String]) -> Result<()> {
        for table in tables {
            naming::validate_identifier(table)?;
        }
        let conn = self.conn().await?;
        for table in tables {
            conn.batch_execute(&format!("DROP TABLE IF EXISTS {table}"))
                .await
                .map_err(|e| Error::Backend(anyhow::anyhow!("drop table '{}': {}", table, e)))?;

            tracing::info!(table = %table, "online table dropped");
        }
        Ok(())
    }

    async fn upsert(&self, table: &str, record: FeatureRecord) -> Result<()> {
        naming::validate_identifier(table)?;
        let conn = self.conn().await?;
        let blob = record.value.to_blob()?;

        let sql = format!(
            r#"
            INSERT INTO {table} (entity_key, feature_name, value, event_ts, created_ts)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (entity_key, feature_name)
            DO UPDATE SET value = EXCLUDED.value,
                          event_ts = EXCLUDED.event_ts,
                          created_ts = EXCLUDED.created_ts
            "#,
        );
        conn.execute(
            &sql,
            &[
                &record.entity_key,
                &record.feature_name,
                &blob,
                &record.event_ts,
                &record.created_ts,
            ],
        )
        .await
        .map_err(|e| Error::Backend(anyhow::anyhow!("upsert into '{}': {}", table, e)))?;

        Ok(())
    }

    async fn read(&self, table: &str, entity_key: &str) -> Result<Option<RowSnapshot>> {
        naming::validate_identifier(table)?;
        let conn = self.conn().await?;

        let sql = format!(
            "SELECT feature_name, value, event_ts FROM {table} WHERE entity_key = $1",
        );
        let rows = conn
            .query(&sql, &[&entity_key])
            .await
            .map_err(|e| Error::Backend(anyhow::anyhow!("read from '{}': {}", table, e)))?;

        let mut features = HashMap::new();
        // The snapshot timestamp is whichever row arrives last; result order
        // is whatever the engine returns for the key scan.
        let mut last_ts = None;
        for row in rows {
            let feature_name: String = row.get(0);
            let blob: Vec<u8> = row.get(1);
            features.insert(feature_name, FeatureValue::from_blob(&blob)?);
            last_ts = row.get(2);
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
        let conn = self.conn().await?;
        conn.execute("SELECT 1", &[])
            .await
            .map_err(|e| Error::Backend(anyhow::anyhow!("health check failed: {}", e)))?;
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "postgres"
    }
}
