//! Error types for FeatureGate
//!
//! This module defines all error types that can occur in the gateway and its
//! drivers. We use the `thiserror` crate to make error definitions concise
//! and ergonomic.
//!
//! ## Design Philosophy
//!
//! - Validation, configuration, authorization, and backend failures are
//!   distinct categories: the HTTP layer maps each to a different status code
//! - Backend errors wrap the underlying cause to preserve context
//! - Make it easy to convert between error types

use thiserror::Error;

/// Result type alias for operations that can fail
///
/// Instead of writing `Result<T, Error>` everywhere, we can just write
/// `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors that can occur in FeatureGate
///
/// Each variant represents a different category of error with relevant
/// context. The `#[error(...)]` attribute defines the display message.
#[derive(Error, Debug)]
pub enum Error {
    /// Caller-supplied input is structurally invalid
    ///
    /// Uneven entity columns, malformed feature references, bad table names.
    /// Mapped to 400 at the gateway boundary.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Required configuration is missing or malformed
    ///
    /// Fatal to the request; fatal to the process at startup.
    #[error("Configuration error: {0}")]
    Config(String),

    /// No credentials could be resolved for the tenant
    ///
    /// Distinct from backend failures: the referenced user or project has no
    /// registered session. Mapped to 401, never 500.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Entity key contains a value type the key codec cannot encode
    ///
    /// The codec fails fast rather than silently stringifying the value.
    #[error("Unsupported entity key value type: {0}")]
    UnsupportedKeyType(String),

    /// Storage or downstream-service failure
    ///
    /// Connection refused, timeout, SQL error. Wraps the original error to
    /// preserve context. Not retried anywhere in this crate.
    #[error("Backend error: {0}")]
    Backend(#[from] anyhow::Error),

    /// Serialization/deserialization error
    ///
    /// Occurs when converting feature values or wire bodies to/from JSON.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The remote gateway rejected a proxied operation
    #[error("Gateway returned status {status}: {message}")]
    RemoteGateway { status: u16, message: String },

    /// Operation is not executed locally in proxy mode
    ///
    /// Storage reads and writes happen inside the gateway process; the proxy
    /// driver only dispatches schema and materialization calls.
    #[error("'{0}' is handled by the gateway in proxy mode")]
    ProxyUnsupported(&'static str),
}

// Helper implementations to make error creation more ergonomic

impl Error {
    /// Creates a Validation error from a string
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Creates a Config error from a string
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an Unauthorized error from a string
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    /// Creates a Backend error from any error type
    pub fn backend<E: std::error::Error + Send + Sync + 'static>(err: E) -> Self {
        Self::Backend(anyhow::Error::new(err))
    }

    /// Creates a Backend error from a message
    pub fn backend_msg(msg: impl Into<String>) -> Self {
        Self::Backend(anyhow::anyhow!(msg.into()))
    }
}
