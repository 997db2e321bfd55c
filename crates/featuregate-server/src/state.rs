//! Application state shared across all HTTP handlers
//!
//! ## Design Pattern: Dependency Injection
//!
//! Rather than using global variables, we pass state explicitly to each
//! handler. This makes the code:
//! - Easier to test (inject the in-memory backend and a fake engine)
//! - Easier to reason about (explicit dependencies)
//! - Thread-safe (Axum requires state to be Clone + Send + Sync)
//!
//! Tenant state in particular lives here — the session registry is the only
//! cross-request mutable structure, and it is never mirrored into process
//! environment variables.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use featuregate_core::{Materializer, Result, SessionRegistry, StoreBackend};
use featuregate_online::{MemoryBackend, PostgresBackend, SqlMaterializer};

use crate::config::{Config, OnlineStoreConfig};

/// Shared application state
///
/// Wrapped in an Arc so handlers clone cheaply.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Process-wide tenant sessions
    sessions: SessionRegistry,

    /// The online store every request executes against
    backend: Arc<dyn StoreBackend>,

    /// The batch engine behind the materialize endpoints
    engine: Arc<dyn Materializer>,

    /// Named feature-service bundles
    services: HashMap<String, Vec<String>>,

    /// Server start time (for uptime reporting)
    start_time: Instant,
}

impl AppState {
    /// Build state from loaded configuration
    ///
    /// Fails fast on configuration errors; the process should not start
    /// without a usable online store.
    pub fn from_config(config: &Config) -> Result<Self> {
        let backend: Arc<dyn StoreBackend> = match &config.online_store {
            OnlineStoreConfig::Memory => {
                tracing::info!("online store: in-memory backend");
                Arc::new(MemoryBackend::new())
            }
            OnlineStoreConfig::Postgres { profile } => {
                tracing::info!(host = %profile.host, database = %profile.database, "online store: postgres backend");
                Arc::new(PostgresBackend::new(profile)?)
            }
        };

        let offline = config.offline_store.as_ref().map(|o| o.profile.clone());
        if offline.is_none() {
            tracing::warn!("offline store not configured; materialize endpoints will reject requests");
        }
        let engine = Arc::new(SqlMaterializer::new(offline, backend.clone()));

        Ok(Self::with_components(
            backend,
            engine,
            config.feature_services.clone(),
        ))
    }

    /// Build state from explicit components
    ///
    /// Used by `from_config` and by tests that inject doubles.
    pub fn with_components(
        backend: Arc<dyn StoreBackend>,
        engine: Arc<dyn Materializer>,
        services: HashMap<String, Vec<String>>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                sessions: SessionRegistry::new(),
                backend,
                engine,
                services,
                start_time: Instant::now(),
            }),
        }
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.inner.sessions
    }

    pub fn backend(&self) -> &Arc<dyn StoreBackend> {
        &self.inner.backend
    }

    pub fn engine(&self) -> &Arc<dyn Materializer> {
        &self.inner.engine
    }

    pub fn services(&self) -> &HashMap<String, Vec<String>> {
        &self.inner.services
    }

    /// Server uptime in seconds
    pub fn uptime(&self) -> u64 {
        self.inner.start_time.elapsed().as_secs()
    }
}
