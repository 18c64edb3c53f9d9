#![forbid(unsafe_code)]

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::Json;
use chrono::Utc;
use mindwtr_contracts::{validate_task_title, Task, TaskStatus, TaskUpdate};
use mindwtr_engines::{apply_task_updates, new_task, parse_quick_add, search_all, soft_delete_task};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::routes::parse_json_body;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    #[serde(default)]
    pub title: Option<String>,
    /// Quick-add syntax; used when `title` is absent.
    #[serde(default)]
    pub input: Option<String>,
    #[serde(default)]
    pub props: Option<TaskUpdate>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TaskListQuery {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub all: Option<String>,
    #[serde(default)]
    pub deleted: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub query: Option<String>,
}

fn truthy(raw: Option<&str>) -> bool {
    matches!(raw, Some("1") | Some("true") | Some("yes"))
}

pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<TaskListQuery>,
) -> Result<Json<Value>, ApiError> {
    let tenant_key = state.gate(&headers, &Method::GET, "/v1/tasks")?;

    let status_filter = match params.status.as_deref() {
        Some(raw) => Some(TaskStatus::parse(raw).ok_or_else(|| {
            ApiError::BadRequest(format!("unknown status filter: {raw}"))
        })?),
        None => None,
    };
    let include_deleted = truthy(params.deleted.as_deref());
    let include_closed = truthy(params.all.as_deref());
    let needle = params
        .query
        .as_deref()
        .map(|q| q.trim().to_lowercase())
        .filter(|q| !q.is_empty());

    let document = state.load_checked_document(&tenant_key)?;
    let tasks: Vec<&Task> = document
        .tasks
        .iter()
        .filter(|task| include_deleted || !task.is_deleted())
        .filter(|task| match status_filter {
            Some(status) => task.status == status,
            None => include_closed || !task.status.is_closed(),
        })
        .filter(|task| match &needle {
            Some(needle) => {
                task.title.to_lowercase().contains(needle)
                    || task
                        .description
                        .as_deref()
                        .map_or(false, |d| d.to_lowercase().contains(needle))
            }
            None => true,
        })
        .collect();

    Ok(Json(json!({ "tasks": tasks })))
}

pub async fn create_task(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let tenant_key = state.gate(&headers, &Method::POST, "/v1/tasks")?;
    let request: CreateTaskRequest = parse_json_body(&body, state.config.max_body_bytes)?;

    let now = Utc::now();
    let (title, quick) = match (&request.title, &request.input) {
        (Some(title), _) => (title.trim().to_string(), None),
        (None, Some(input)) => {
            let quick = parse_quick_add(input);
            (quick.title.clone(), Some(quick))
        }
        (None, None) => {
            return Err(ApiError::BadRequest(
                "either title or input is required".to_string(),
            ))
        }
    };
    validate_task_title(&title, state.config.max_title_len)?;

    let (tags, contexts, quick_status) = match quick {
        Some(quick) => (quick.tags, quick.contexts, quick.status),
        None => (Vec::new(), Vec::new(), None),
    };
    let mut updates = request.props.unwrap_or_default();
    if updates.status.is_none() {
        updates.status = quick_status;
    }
    let base = new_task(title, TaskStatus::Inbox, tags, contexts, now);
    let task = if updates.is_empty() {
        base
    } else {
        let outcome = apply_task_updates(&base, &updates, now);
        validate_task_title(&outcome.updated.title, state.config.max_title_len)?;
        outcome.updated
    };

    let _guard = state.write_locks.acquire(&tenant_key).await;
    let mut document = state.load_checked_document(&tenant_key)?;
    document.tasks.push(task.clone());
    state.save_tenant_document(&tenant_key, &document)?;

    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Task>, ApiError> {
    let tenant_key = state.gate(&headers, &Method::GET, &format!("/v1/tasks/{id}"))?;
    let document = state.load_checked_document(&tenant_key)?;
    let task = document
        .tasks
        .into_iter()
        .find(|task| task.id == id)
        .ok_or(ApiError::NotFound)?;
    Ok(Json(task))
}

pub async fn patch_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Task>, ApiError> {
    let tenant_key = state.gate(&headers, &Method::PATCH, &format!("/v1/tasks/{id}"))?;
    let updates: TaskUpdate = parse_json_body(&body, state.config.max_body_bytes)?;
    if let Some(title) = &updates.title {
        validate_task_title(title, state.config.max_title_len)?;
    }
    apply_to_task(&state, &tenant_key, &id, &updates).await
}

pub async fn delete_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let tenant_key = state.gate(&headers, &Method::DELETE, &format!("/v1/tasks/{id}"))?;

    let _guard = state.write_locks.acquire(&tenant_key).await;
    let mut document = state.load_checked_document(&tenant_key)?;
    let slot = document
        .tasks
        .iter_mut()
        .find(|task| task.id == id)
        .ok_or(ApiError::NotFound)?;
    *slot = soft_delete_task(slot, Utc::now());
    state.save_tenant_document(&tenant_key, &document)?;
    Ok(Json(json!({ "ok": true })))
}

/// `POST /v1/tasks/:id/complete` and `…/archive`: status-transition
/// shortcuts routed through the same update path as PATCH, so completing a
/// recurring task appends its follow-up here too.
pub async fn task_action(
    State(state): State<Arc<AppState>>,
    Path((id, action)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Json<Task>, ApiError> {
    let tenant_key = state.gate(
        &headers,
        &Method::POST,
        &format!("/v1/tasks/{id}/{action}"),
    )?;
    let status = match action.as_str() {
        "complete" => TaskStatus::Done,
        "archive" => TaskStatus::Archived,
        _ => return Err(ApiError::NotFound),
    };
    apply_to_task(&state, &tenant_key, &id, &TaskUpdate::with_status(status)).await
}

async fn apply_to_task(
    state: &AppState,
    tenant_key: &str,
    id: &str,
    updates: &TaskUpdate,
) -> Result<Json<Task>, ApiError> {
    let _guard = state.write_locks.acquire(tenant_key).await;
    let mut document = state.load_checked_document(tenant_key)?;
    let index = document
        .tasks
        .iter()
        .position(|task| task.id == id)
        .ok_or(ApiError::NotFound)?;

    let outcome = apply_task_updates(&document.tasks[index], updates, Utc::now());
    document.tasks[index] = outcome.updated.clone();
    if let Some(next) = outcome.next_recurring {
        document.tasks.push(next);
    }
    state.save_tenant_document(tenant_key, &document)?;
    Ok(Json(outcome.updated))
}

pub async fn list_projects(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let tenant_key = state.gate(&headers, &Method::GET, "/v1/projects")?;
    let document = state.load_checked_document(&tenant_key)?;
    let projects: Vec<_> = document
        .projects
        .iter()
        .filter(|project| !project.is_deleted())
        .collect();
    Ok(Json(json!({ "projects": projects })))
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<SearchQuery>,
) -> Result<Json<Value>, ApiError> {
    let tenant_key = state.gate(&headers, &Method::GET, "/v1/search")?;
    let document = state.load_checked_document(&tenant_key)?;
    let results = search_all(&document, params.query.as_deref().unwrap_or_default());
    Ok(Json(json!({
        "tasks": results.tasks,
        "projects": results.projects,
    })))
}
