#![forbid(unsafe_code)]

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method};
use axum::Json;
use mindwtr_contracts::{validate_app_data, AppDocument};
use mindwtr_storage::load_document_value;
use serde_json::Value;

use crate::error::ApiError;
use crate::state::AppState;

/// Whole-document export. The stored value is validated before it goes out
/// so a corrupt file surfaces as a 500 instead of feeding garbage to a
/// client that will sync it back.
pub async fn get_data(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let tenant_key = state.gate(&headers, &Method::GET, "/v1/data")?;
    let value = load_document_value(&state.document_path(&tenant_key));
    validate_app_data(&value)
        .map_err(|violation| ApiError::Internal(format!("stored document invalid: {violation}")))?;
    Ok(Json(value))
}

/// Whole-document import, last write wins. The body replaces the stored
/// document after validation; there is no merge.
pub async fn put_data(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let tenant_key = state.gate(&headers, &Method::PUT, "/v1/data")?;
    if body.len() > state.config.max_body_bytes {
        return Err(ApiError::PayloadTooLarge {
            limit_bytes: state.config.max_body_bytes,
        });
    }
    let value: Value = serde_json::from_slice(&body)
        .map_err(|err| ApiError::BadRequest(format!("invalid JSON body: {err}")))?;
    validate_app_data(&value)?;
    let document: AppDocument = serde_json::from_value(value)
        .map_err(|err| ApiError::BadRequest(format!("invalid document: {err}")))?;

    let _guard = state.write_locks.acquire(&tenant_key).await;
    state.save_tenant_document(&tenant_key, &document)?;
    Ok(Json(serde_json::json!({ "ok": true })))
}
