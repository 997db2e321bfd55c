//! # FeatureGate Core Library
//!
//! Foundation library for FeatureGate, containing the types and traits used
//! across the drivers and the gateway.
//!
//! ## Architecture Principle: KISS (Keep It Simple, Stupid)
//!
//! This crate intentionally has minimal dependencies and focuses on defining
//! clean interfaces rather than complex implementations. The goal is to make
//! it easy to:
//! - Understand the storage and tenancy contracts
//! - Add new storage backends
//! - Test components in isolation
//!
//! ## Key Components
//!
//! - **StoreBackend / Materializer**: the traits storage backends and batch
//!   engines implement
//! - **Key codec**: order-preserving entity key encoding
//! - **Naming**: tenant-scoped physical table names
//! - **SessionRegistry**: process-wide tenant credential sessions

// Re-export commonly used types for convenience
pub use error::{Error, Result};
pub use key_codec::{encode_entity_key, key_value_from_json};
pub use naming::physical_table_name;
pub use profile::ConnectionProfile;
pub use session::{SessionRegistry, TenantContext, TenantSession};
pub use store::{Materializer, StoreBackend};
pub use types::{
    parse_timestamp, to_naive_utc, EntityKey, FeatureRecord, FeatureRef, FeatureValue, KeyValue,
    RowSnapshot, WriteRow,
};

// Module declarations
mod error;
pub mod key_codec;
pub mod naming;
mod profile;
pub mod session;
mod store;
mod types;

// Prelude module - commonly used imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::key_codec::encode_entity_key;
    pub use crate::naming::physical_table_name;
    pub use crate::profile::ConnectionProfile;
    pub use crate::session::{SessionRegistry, TenantContext, TenantSession};
    pub use crate::store::{Materializer, StoreBackend};
    pub use crate::types::{EntityKey, FeatureRecord, FeatureValue, KeyValue, RowSnapshot, WriteRow};
}
