#![forbid(unsafe_code)]

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Request, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::de::DeserializeOwned;

use crate::error::ApiError;
use crate::state::AppState;
use crate::{attachments, data, tasks};

pub fn router(state: Arc<AppState>) -> Router {
    // The framework limit sits above both configured caps so oversize
    // bodies reach the handlers' own checks and come back as JSON 413s.
    let framework_limit = state
        .config
        .max_body_bytes
        .max(state.config.max_attachment_bytes)
        .saturating_mul(2)
        .max(1024);

    Router::new()
        .route("/health", get(health))
        .route("/v1/tasks", get(tasks::list_tasks).post(tasks::create_task))
        .route(
            "/v1/tasks/:id",
            get(tasks::get_task)
                .patch(tasks::patch_task)
                .delete(tasks::delete_task),
        )
        .route("/v1/tasks/:id/:action", post(tasks::task_action))
        .route("/v1/projects", get(tasks::list_projects))
        .route("/v1/search", get(tasks::search))
        .route("/v1/data", get(data::get_data).put(data::put_data))
        .route(
            "/v1/attachments/*path",
            get(attachments::get_attachment)
                .put(attachments::put_attachment)
                .delete(attachments::delete_attachment),
        )
        .layer(DefaultBodyLimit::max(framework_limit))
        .layer(middleware::from_fn_with_state(state.clone(), cors))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Single-origin CORS: every response carries the configured origin and
/// preflights short-circuit with 200 before auth or rate limiting run.
async fn cors(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::OK.into_response()
    } else {
        next.run(request).await
    };

    let headers = response.headers_mut();
    if let Ok(origin) = HeaderValue::from_str(&state.config.cors_origin) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    }
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, PUT, PATCH, DELETE, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Authorization, Content-Type"),
    );
    response
}

pub(crate) fn parse_json_body<T: DeserializeOwned>(
    body: &Bytes,
    max_bytes: usize,
) -> Result<T, ApiError> {
    if body.len() > max_bytes {
        return Err(ApiError::PayloadTooLarge {
            limit_bytes: max_bytes,
        });
    }
    serde_json::from_slice(body)
        .map_err(|err| ApiError::BadRequest(format!("invalid JSON body: {err}")))
}
