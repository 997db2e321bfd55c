//! FeatureGate Online Store - drivers and backends
//!
//! This crate provides the storage side of the gateway: the backends that
//! execute online-store CRUD, the dual-mode driver façade the host framework
//! calls, and the window-sync engine that copies features from the offline
//! store.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        Online Store Access                       │
//! ├──────────────────────────────────────────────────────────────────┤
//! │                                                                  │
//! │   DirectDriver ──────────────────────────► StoreBackend          │
//! │      (in-process)                          (Postgres / Memory)   │
//! │                                                 ▲                │
//! │   ProxyDriver ──── HTTP ────► Gateway ──────────┘                │
//! │      (client SDK)             (featuregate-server)               │
//! │                                                                  │
//! │   SqlMaterializer: offline dataset ──window sync──► StoreBackend │
//! │                                                                  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Mode selection is a deployment choice made at driver construction, never
//! a per-call branch.

// Re-export core types callers need alongside the drivers
pub use featuregate_core::{
    ConnectionProfile, EntityKey, FeatureRecord, FeatureValue, KeyValue, Materializer,
    RowSnapshot, StoreBackend, TenantContext, WriteRow,
};

pub mod driver;
pub mod gateway_client;
pub mod memory_backend;
pub mod postgres_backend;
pub mod sync;

pub use driver::{DirectDriver, OnlineDriver, ProxyDriver};
pub use gateway_client::GatewayClient;
pub use memory_backend::MemoryBackend;
pub use postgres_backend::PostgresBackend;
pub use sync::SqlMaterializer;
