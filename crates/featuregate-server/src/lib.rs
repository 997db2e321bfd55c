//! FeatureGate gateway library
//!
//! The HTTP surface of the multi-tenant materialization gateway. The binary
//! in `main.rs` wires this router to a listener; integration tests drive it
//! directly with `tower::ServiceExt`.

use axum::{
    routing::{delete, get, post},
    Router,
};

pub mod api;
pub mod config;
pub mod error;
pub mod retrieval;
pub mod shutdown;
pub mod state;

use state::AppState;

/// Build the gateway router over the given state
///
/// Route table:
/// - `GET  /ping`
/// - `POST /api/v1/materialize`
/// - `POST /api/v1/materialize_incr`
/// - `POST /api/v1/infra_update`
/// - `DELETE /api/v1/teardown`
/// - `GET  /api/v1/registry/{project}`
/// - `GET  /api/v1/user_info`
/// - `GET  /get-online-features`
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/ping", get(api::ping))
        .route("/api/v1/materialize", post(api::materialize))
        .route("/api/v1/materialize_incr", post(api::materialize_incremental))
        .route("/api/v1/infra_update", post(api::infra_update))
        .route("/api/v1/teardown", delete(api::teardown))
        .route("/api/v1/registry/{project}", get(api::registry_dump))
        .route("/api/v1/user_info", get(api::user_info))
        .route("/get-online-features", get(retrieval::get_online_features))
        .with_state(state)
}
