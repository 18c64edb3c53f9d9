#![forbid(unsafe_code)]

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::error::ApiError;
use crate::state::AppState;

pub async fn get_attachment(
    State(state): State<Arc<AppState>>,
    Path(rel_path): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let tenant_key = state.gate(
        &headers,
        &Method::GET,
        &format!("/v1/attachments/{rel_path}"),
    )?;
    let bytes = state.attachment_store(&tenant_key).get(&rel_path)?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/octet-stream")],
        bytes,
    )
        .into_response())
}

pub async fn put_attachment(
    State(state): State<Arc<AppState>>,
    Path(rel_path): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ApiError> {
    let tenant_key = state.gate(
        &headers,
        &Method::PUT,
        &format!("/v1/attachments/{rel_path}"),
    )?;
    // Content-Length lets us refuse an oversized upload before buffering it.
    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if matches!(declared, Some(len) if len > state.config.max_attachment_bytes) {
        return Err(ApiError::PayloadTooLarge {
            limit_bytes: state.config.max_attachment_bytes,
        });
    }
    state
        .attachment_store(&tenant_key)
        .put(&rel_path, &body, state.config.max_attachment_bytes)?;
    Ok(Json(json!({ "ok": true })))
}

pub async fn delete_attachment(
    State(state): State<Arc<AppState>>,
    Path(rel_path): Path<String>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let tenant_key = state.gate(
        &headers,
        &Method::DELETE,
        &format!("/v1/attachments/{rel_path}"),
    )?;
    state.attachment_store(&tenant_key).delete(&rel_path)?;
    Ok(Json(json!({ "ok": true })))
}
