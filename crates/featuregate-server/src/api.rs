//! HTTP API handlers for the materialization gateway
//!
//! Every handler follows the same shape:
//! 1. Parse the typed request body
//! 2. Run session intake, then resolve tenant credentials (request fields
//!    first, session registry by project second)
//! 3. Execute against the batch engine or the storage backend
//! 4. Respond 2xx with an empty body, or map the error to a status code

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use serde::Deserialize;
use std::collections::HashMap;

use featuregate_core::{
    naming, parse_timestamp, Error, TenantContext, TenantSession,
};

use crate::{error::Result, state::AppState};

// ============================================================================
// Session intake
// ============================================================================

/// Outcome of the per-request session registration step
///
/// A request without a `user` field skips registration entirely. This is a
/// deliberate bypass for callers that rely on a previously registered
/// session, not an error.
#[derive(Debug, PartialEq, Eq)]
pub enum SessionIntake {
    Registered,
    Skipped,
}

/// Extract the bearer credential from the Authorization header
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|v| v.to_string())
}

/// Register the caller's session from the request, if it names a user
///
/// Overwrites any previous session for the same user (last write wins).
pub fn intake_session(
    state: &AppState,
    headers: &HeaderMap,
    project: &str,
    user: Option<&String>,
    offline_dataset: Option<&String>,
) -> SessionIntake {
    let Some(user) = user else {
        tracing::debug!(project = %project, "session intake skipped: request names no user");
        return SessionIntake::Skipped;
    };

    state.sessions().put(TenantSession {
        user: user.clone(),
        project: project.to_string(),
        token: bearer_token(headers).unwrap_or_default(),
        offline_dataset: offline_dataset.cloned(),
    });
    tracing::debug!(user = %user, project = %project, "session registered");
    SessionIntake::Registered
}

/// Resolve the tenant context for one request
///
/// Credentials come from the request fields when present; otherwise from the
/// session registry by project. A project with neither is unauthorized, not
/// a backend failure.
fn resolve_tenant(
    state: &AppState,
    headers: &HeaderMap,
    project: &str,
    user: Option<&String>,
    offline_dataset: Option<&String>,
) -> Result<TenantContext> {
    if let Some(user) = user {
        return Ok(TenantContext {
            project: project.to_string(),
            user: Some(user.clone()),
            token: bearer_token(headers),
            offline_dataset: offline_dataset.cloned(),
        });
    }

    match state.sessions().get_by_project(project) {
        Some(session) => Ok(TenantContext::from_session(&session)),
        None => Err(Error::unauthorized(format!(
            "no credentials registered for project '{project}'"
        ))
        .into()),
    }
}

// ============================================================================
// Ping
// ============================================================================

/// Liveness endpoint
///
/// `GET /ping` → `{"message": "pong"}`
pub async fn ping() -> Json<serde_json::Value> {
    Json(serde_json::json!({"message": "pong"}))
}

// ============================================================================
// Materialization
// ============================================================================

/// Body of `POST /api/v1/materialize`
#[derive(Debug, Deserialize)]
pub struct MaterializeRequest {
    pub project: String,
    pub start_date: String,
    pub end_date: String,
    #[serde(default)]
    pub feature_views: Option<Vec<String>>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub offline_dataset: Option<String>,
}

/// Trigger a windowed materialization job
///
/// `POST /api/v1/materialize` → 201 with an empty body on success.
pub async fn materialize(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<MaterializeRequest>,
) -> Result<StatusCode> {
    naming::validate_project(&request.project)?;
    intake_session(
        &state,
        &headers,
        &request.project,
        request.user.as_ref(),
        request.offline_dataset.as_ref(),
    );
    let ctx = resolve_tenant(
        &state,
        &headers,
        &request.project,
        request.user.as_ref(),
        request.offline_dataset.as_ref(),
    )?;

    let start = parse_timestamp(&request.start_date)?;
    let end = parse_timestamp(&request.end_date)?;

    tracing::info!(
        project = %ctx.project,
        start = %start,
        end = %end,
        "materialize requested"
    );
    state
        .engine()
        .materialize(&ctx, start, end, request.feature_views)
        .await?;

    Ok(StatusCode::CREATED)
}

/// Body of `POST /api/v1/materialize_incr`
#[derive(Debug, Deserialize)]
pub struct MaterializeIncrementalRequest {
    pub project: String,
    pub end_date: String,
    #[serde(default)]
    pub feature_views: Option<Vec<String>>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub offline_dataset: Option<String>,
}

/// Trigger an incremental materialization job
///
/// `POST /api/v1/materialize_incr` → 201 with an empty body on success.
pub async fn materialize_incremental(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<MaterializeIncrementalRequest>,
) -> Result<StatusCode> {
    naming::validate_project(&request.project)?;
    intake_session(
        &state,
        &headers,
        &request.project,
        request.user.as_ref(),
        request.offline_dataset.as_ref(),
    );
    let ctx = resolve_tenant(
        &state,
        &headers,
        &request.project,
        request.user.as_ref(),
        request.offline_dataset.as_ref(),
    )?;

    let end = parse_timestamp(&request.end_date)?;

    tracing::info!(project = %ctx.project, end = %end, "incremental materialize requested");
    state
        .engine()
        .materialize_incremental(&ctx, end, request.feature_views)
        .await?;

    Ok(StatusCode::CREATED)
}

// ============================================================================
// Infra management
// ============================================================================

/// Body of `POST /api/v1/infra_update`
///
/// Table names arrive already resolved to their physical form by the calling
/// driver; the gateway validates them before touching SQL. Entity lists are
/// accepted for interface parity and have no storage footprint.
#[derive(Debug, Deserialize)]
pub struct InfraUpdateRequest {
    pub project: String,
    pub tables_to_keep: Vec<String>,
    pub tables_to_delete: Vec<String>,
    #[serde(default)]
    pub entities_to_keep: Vec<String>,
    #[serde(default)]
    pub entities_to_delete: Vec<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub offline_dataset: Option<String>,
}

/// Sync the project's table set: create kept tables, drop deleted ones
///
/// `POST /api/v1/infra_update` → 201 with an empty body on success.
pub async fn infra_update(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<InfraUpdateRequest>,
) -> Result<StatusCode> {
    naming::validate_project(&request.project)?;
    intake_session(
        &state,
        &headers,
        &request.project,
        request.user.as_ref(),
        request.offline_dataset.as_ref(),
    );

    for table in request.tables_to_keep.iter().chain(&request.tables_to_delete) {
        naming::validate_identifier(table)?;
    }

    tracing::info!(
        project = %request.project,
        keep = request.tables_to_keep.len(),
        delete = request.tables_to_delete.len(),
        "infra update requested"
    );
    state.backend().create_tables(&request.tables_to_keep).await?;
    state.backend().drop_tables(&request.tables_to_delete).await?;

    Ok(StatusCode::CREATED)
}

/// Body of `DELETE /api/v1/teardown`
#[derive(Debug, Deserialize)]
pub struct TeardownRequest {
    pub project: String,
    pub tables: Vec<String>,
    #[serde(default)]
    pub entities: Vec<String>,
    #[serde(default)]
    pub user: Option<String>,
}

/// Drop all of the project's deployed tables
///
/// `DELETE /api/v1/teardown` → 200 with an empty body on success.
pub async fn teardown(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<TeardownRequest>,
) -> Result<StatusCode> {
    naming::validate_project(&request.project)?;
    intake_session(&state, &headers, &request.project, request.user.as_ref(), None);

    for table in &request.tables {
        naming::validate_identifier(table)?;
    }

    tracing::info!(project = %request.project, tables = request.tables.len(), "teardown requested");
    state.backend().drop_tables(&request.tables).await?;

    Ok(StatusCode::OK)
}

// ============================================================================
// Session inspection
// ============================================================================

/// Dump the registered session for one project
///
/// `GET /api/v1/registry/{project}` → the session JSON (token redacted), or
/// 404 when the project has no session.
pub async fn registry_dump(
    State(state): State<AppState>,
    Path(project): Path<String>,
) -> Result<Json<TenantSession>> {
    match state.sessions().get_by_project(&project) {
        Some(session) => Ok(Json(session)),
        None => Err(crate::error::AppError::NotFound(format!(
            "no session registered for project '{project}'"
        ))),
    }
}

/// Dump all known sessions, keyed by user
///
/// `GET /api/v1/user_info` → `{user: session}` (tokens redacted).
pub async fn user_info(
    State(state): State<AppState>,
) -> Json<HashMap<String, TenantSession>> {
    Json(state.sessions().list())
}
