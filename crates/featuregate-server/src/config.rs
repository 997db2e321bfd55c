//! Configuration management
//!
//! Loads the gateway configuration from a YAML file once at startup. The
//! parsed config is injected into the components that need it — there is no
//! process-wide configuration cache.
//!
//! ## Example Configuration File (featuregate.yaml)
//!
//! ```yaml
//! server:
//!   host: "0.0.0.0"
//!   port: 8081
//!
//! online_store:
//!   mode: postgres
//!   profile: "db.internal:5432:feast@s3cret:online"
//!
//! offline_store:
//!   profile: "warehouse.internal:5432:batch@s3cret:offline"
//!
//! feature_services:
//!   driver_ranking:
//!     - "driver_stats:rating"
//!     - "driver_stats:trips_today"
//! ```

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use featuregate_core::ConnectionProfile;

/// Complete gateway configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    /// Server bind settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Online store backend selection
    #[serde(default)]
    pub online_store: OnlineStoreConfig,

    /// Offline store the materialization engine reads from
    #[serde(default)]
    pub offline_store: Option<OfflineStoreConfig>,

    /// Named feature-service bundles resolvable at retrieval time
    #[serde(default)]
    pub feature_services: HashMap<String, Vec<String>>,
}

/// Server bind configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

/// Online store backend configuration
///
/// `memory` keeps everything in-process (development and tests); `postgres`
/// requires a connection profile. Malformed profiles fail at load time.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum OnlineStoreConfig {
    #[default]
    Memory,
    Postgres { profile: ConnectionProfile },
}

/// Offline store configuration
#[derive(Debug, Deserialize, Clone)]
pub struct OfflineStoreConfig {
    pub profile: ConnectionProfile,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8081
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Load configuration from a file
///
/// A missing file falls back to defaults (memory online store, no offline
/// store); an unparseable file is an error and aborts startup.
pub fn load(path: &str) -> anyhow::Result<Config> {
    if !Path::new(path).exists() {
        tracing::warn!("configuration file '{}' not found, using defaults", path);
        return Ok(Config::default());
    }

    let contents = std::fs::read_to_string(path)?;
    let config: Config = serde_yaml::from_str(&contents)?;

    tracing::info!("loaded configuration from {}", path);
    Ok(config)
}
