//! Online feature retrieval path
//!
//! Decodes a wire-format feature request, validates entity-column alignment,
//! reshapes the parallel columns into row-oriented lookups, reads each row
//! through the storage backend, and serializes the serving response.
//!
//! ## Wire Request
//!
//! ```json
//! {
//!   "project": "demo",
//!   "features": ["driver_stats:rating"],
//!   "feature_service": "driver_ranking",
//!   "full_feature_names": false,
//!   "entities": {"driver_id": [1001, 1002]}
//! }
//! ```
//!
//! A named feature service takes precedence over the explicit feature list.
//! Entity columns are parallel arrays; their order in the request is the key
//! order used for storage lookups.
//!
//! ## Wire Response
//!
//! Mirrors the serving schema with original field names: one entry in
//! `results` per requested feature, each carrying per-row `values`,
//! `statuses`, and `event_timestamps`. Floats are emitted at 18 significant
//! digits.

use axum::{body::Bytes, extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use featuregate_core::{
    encode_entity_key, key_value_from_json, physical_table_name, EntityKey, Error, FeatureRef,
    FeatureValue, RowSnapshot,
};

use crate::{error::Result, state::AppState};

/// Wire timestamp format for `event_timestamps` entries
const WIRE_TS_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Decoded retrieval request
#[derive(Debug, Deserialize)]
pub struct OnlineFeaturesRequest {
    pub project: String,

    /// Explicit feature references (`view:feature`)
    #[serde(default)]
    pub features: Option<Vec<String>>,

    /// Named feature-service bundle; takes precedence over `features`
    #[serde(default)]
    pub feature_service: Option<String>,

    #[serde(default)]
    pub full_feature_names: bool,

    /// Parallel typed columns: join key name → array of values
    ///
    /// Deserialized into an order-preserving map so the caller's key order
    /// survives into the storage key encoding.
    pub entities: serde_json::Map<String, Value>,
}

/// Serve the latest feature values for a batch of entities
///
/// `GET /get-online-features` with the wire request as the body.
pub async fn get_online_features(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>> {
    let request: OnlineFeaturesRequest = serde_json::from_slice(&body)
        .map_err(|e| Error::validation(format!("malformed feature request: {e}")))?;

    tracing::info!(
        project = %request.project,
        entity_columns = request.entities.len(),
        "online features requested"
    );

    let response = serve(&state, request).await?;
    Ok(Json(response))
}

async fn serve(state: &AppState, request: OnlineFeaturesRequest) -> Result<Value> {
    // 1. Determine the requested features; a service reference wins.
    let refs = resolve_features(state, &request)?;

    // 2. Validate that every entity column has the same length.
    let columns = aligned_columns(&request.entities)?;
    let num_rows = columns.first().map_or(0, |(_, values)| values.len());

    // 3. Transpose columns into one composite key per entity instance.
    let keys = transpose_rows(&columns, num_rows)?;

    // 4. Row-oriented lookups, one table scan set per distinct view.
    let mut results = Vec::with_capacity(refs.len());
    let mut feature_names = Vec::with_capacity(refs.len());

    let mut snapshots_by_view: Vec<(String, Vec<Option<RowSnapshot>>)> = Vec::new();
    for fref in &refs {
        if !snapshots_by_view.iter().any(|(view, _)| view == &fref.view) {
            let table = physical_table_name(&request.project, &fref.view)?;
            let mut snapshots = Vec::with_capacity(keys.len());
            for key in &keys {
                let encoded = encode_entity_key(key)?;
                snapshots.push(state.backend().read(&table, &encoded).await?);
            }
            snapshots_by_view.push((fref.view.clone(), snapshots));
        }
    }

    // 5. Serialize per-feature result vectors in request order.
    for fref in &refs {
        let snapshots = snapshots_by_view
            .iter()
            .find(|(view, _)| view == &fref.view)
            .map(|(_, s)| s)
            .ok_or_else(|| {
                crate::error::AppError::Internal(format!(
                    "no snapshots collected for view '{}'",
                    fref.view
                ))
            })?;

        let mut values = Vec::with_capacity(keys.len());
        let mut statuses = Vec::with_capacity(keys.len());
        let mut event_timestamps = Vec::with_capacity(keys.len());

        for snapshot in snapshots.iter() {
            let feature = snapshot
                .as_ref()
                .and_then(|s| s.features.get(&fref.feature));
            match feature {
                Some(value) => {
                    values.push(feature_value_to_wire(value));
                    statuses.push(Value::String("PRESENT".to_string()));
                }
                None => {
                    values.push(Value::Null);
                    statuses.push(Value::String("NOT_FOUND".to_string()));
                }
            }
            event_timestamps.push(
                snapshot
                    .as_ref()
                    .and_then(|s| s.event_ts)
                    .map(|ts| Value::String(ts.format(WIRE_TS_FORMAT).to_string()))
                    .unwrap_or(Value::Null),
            );
        }

        feature_names.push(if request.full_feature_names {
            fref.full_name()
        } else {
            fref.feature.clone()
        });
        results.push(json!({
            "values": values,
            "statuses": statuses,
            "event_timestamps": event_timestamps,
        }));
    }

    Ok(json!({
        "metadata": {"feature_names": {"val": feature_names}},
        "results": results,
    }))
}

/// Resolve the requested feature references
///
/// Feature-service references take precedence over the explicit list. An
/// unknown service name or an empty request is a validation error.
fn resolve_features(state: &AppState, request: &OnlineFeaturesRequest) -> Result<Vec<FeatureRef>> {
    let raw: Vec<String> = if let Some(service) = &request.feature_service {
        state
            .services()
            .get(service)
            .cloned()
            .ok_or_else(|| Error::validation(format!("unknown feature service '{service}'")))?
    } else {
        request
            .features
            .clone()
            .ok_or_else(|| Error::validation("request names neither features nor a feature service"))?
    };

    if raw.is_empty() {
        return Err(Error::validation("no features requested").into());
    }
    raw.iter()
        .map(|r| FeatureRef::parse(r).map_err(Into::into))
        .collect()
}

/// Validate column alignment and borrow the columns in request order
fn aligned_columns(
    entities: &serde_json::Map<String, Value>,
) -> Result<Vec<(&String, &Vec<Value>)>> {
    let mut columns = Vec::with_capacity(entities.len());
    for (name, column) in entities {
        let values = column.as_array().ok_or_else(|| {
            Error::validation(format!("entity column '{name}' must be an array"))
        })?;
        columns.push((name, values));
    }

    if columns.is_empty() {
        return Err(Error::validation("entities map is empty").into());
    }

    let lengths: Vec<usize> = columns.iter().map(|(_, v)| v.len()).collect();
    if lengths.windows(2).any(|w| w[0] != w[1]) {
        return Err(Error::validation(format!(
            "uneven entity columns: lengths {lengths:?}"
        ))
        .into());
    }
    Ok(columns)
}

/// Zip the i-th value of every column into one composite key per row
fn transpose_rows(
    columns: &[(&String, &Vec<Value>)],
    num_rows: usize,
) -> Result<Vec<EntityKey>> {
    let mut keys = Vec::with_capacity(num_rows);
    for idx in 0..num_rows {
        let mut pairs = Vec::with_capacity(columns.len());
        for (name, values) in columns {
            pairs.push(((*name).clone(), key_value_from_json(&values[idx])?));
        }
        keys.push(EntityKey::new(pairs));
    }
    Ok(keys)
}

/// Emit a feature value in wire form
///
/// Floats carry 18 significant digits; non-finite floats serialize as null.
fn feature_value_to_wire(value: &FeatureValue) -> Value {
    match value {
        FeatureValue::Int(v) => json!(v),
        FeatureValue::Float(v) => {
            let wire = format!("{:.17e}", v);
            wire.parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .unwrap_or(Value::Null)
        }
        FeatureValue::String(v) => json!(v),
        FeatureValue::Bool(v) => json!(v),
        FeatureValue::Null => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aligned_columns_accepts_equal_lengths() {
        let entities = serde_json::from_str(r#"{"a": [1, 2, 3], "b": [4, 5, 6]}"#).unwrap();
        let columns = aligned_columns(&entities).unwrap();
        assert_eq!(columns.len(), 2);
    }

    #[test]
    fn test_aligned_columns_rejects_uneven_lengths() {
        let entities =
            serde_json::from_str(r#"{"a": [1, 2, 3], "b": [4, 5, 6], "c": [7, 8]}"#).unwrap();
        let err = aligned_columns(&entities).unwrap_err();
        assert!(err.to_string().contains("uneven entity columns"));
    }

    #[test]
    fn test_aligned_columns_rejects_non_array() {
        let entities = serde_json::from_str(r#"{"a": 1}"#).unwrap();
        assert!(aligned_columns(&entities).is_err());
    }

    #[test]
    fn test_transpose_builds_rows_in_index_order() {
        let entities: serde_json::Map<String, Value> =
            serde_json::from_str(r#"{"a": [1, 2], "b": [10, 20]}"#).unwrap();
        let columns = aligned_columns(&entities).unwrap();
        let keys = transpose_rows(&columns, 2).unwrap();

        assert_eq!(keys.len(), 2);
        assert_eq!(
            keys[0].pairs(),
            &[
                ("a".to_string(), featuregate_core::KeyValue::Int(1)),
                ("b".to_string(), featuregate_core::KeyValue::Int(10)),
            ]
        );
        assert_eq!(
            keys[1].pairs(),
            &[
                ("a".to_string(), featuregate_core::KeyValue::Int(2)),
                ("b".to_string(), featuregate_core::KeyValue::Int(20)),
            ]
        );
    }

    #[test]
    fn test_transpose_fails_fast_on_unsupported_key_type() {
        let entities: serde_json::Map<String, Value> =
            serde_json::from_str(r#"{"a": [1.5]}"#).unwrap();
        let columns = aligned_columns(&entities).unwrap();
        assert!(transpose_rows(&columns, 1).is_err());
    }

    #[test]
    fn test_float_wire_precision_roundtrip() {
        let wire = feature_value_to_wire(&FeatureValue::Float(0.1));
        assert_eq!(wire.as_f64(), Some(0.1));

        let wire = feature_value_to_wire(&FeatureValue::Float(f64::NAN));
        assert!(wire.is_null());
    }
}
