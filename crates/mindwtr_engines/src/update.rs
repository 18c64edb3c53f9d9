#![forbid(unsafe_code)]

use chrono::{DateTime, SecondsFormat, Utc};
use mindwtr_contracts::{Task, TaskStatus, TaskUpdate};
use serde_json::Value;
use uuid::Uuid;

/// Outcome of applying an update: the rewritten task, plus the freshly
/// minted follow-up when completing a recurring task.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskUpdateOutcome {
    pub updated: Task,
    pub next_recurring: Option<Task>,
}

pub fn timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn mint_id() -> String {
    Uuid::new_v4().to_string()
}

/// Builds a brand-new task with a server-minted id and server-stamped
/// timestamps. The caller has already validated the title.
pub fn new_task(
    title: String,
    status: TaskStatus,
    tags: Vec<String>,
    contexts: Vec<String>,
    now: DateTime<Utc>,
) -> Task {
    let stamp = timestamp(now);
    Task {
        id: mint_id(),
        title,
        status,
        tags,
        contexts,
        description: None,
        project_id: None,
        created_at: stamp.clone(),
        updated_at: stamp,
        completed_at: None,
        deleted_at: None,
        extra: serde_json::Map::new(),
    }
}

/// Applies a closed [`TaskUpdate`] to an existing task. `updatedAt` is
/// always refreshed; a transition into `done` stamps `completedAt` and, for
/// tasks carrying a recurrence rule, emits the next occurrence as a new
/// inbox task.
pub fn apply_task_updates(
    existing: &Task,
    updates: &TaskUpdate,
    now: DateTime<Utc>,
) -> TaskUpdateOutcome {
    let mut updated = existing.clone();
    let stamp = timestamp(now);

    if let Some(title) = &updates.title {
        updated.title = title.trim().to_string();
    }
    if let Some(description) = &updates.description {
        updated.description = Some(description.clone());
    }
    if let Some(project_id) = &updates.project_id {
        updated.project_id = Some(project_id.clone());
    }
    if let Some(tags) = &updates.tags {
        updated.tags = tags.clone();
    }
    if let Some(contexts) = &updates.contexts {
        updated.contexts = contexts.clone();
    }
    for (key, value) in [
        ("dueDate", &updates.due_date),
        ("startTime", &updates.start_time),
        ("priority", &updates.priority),
        ("reviewAt", &updates.review_at),
    ] {
        if let Some(value) = value {
            updated
                .extra
                .insert(key.to_string(), Value::String(value.clone()));
        }
    }
    if let Some(recurrence) = &updates.recurrence {
        if recurrence.is_null() {
            updated.extra.remove("recurrence");
        } else {
            updated
                .extra
                .insert("recurrence".to_string(), recurrence.clone());
        }
    }

    let mut next_recurring = None;
    if let Some(status) = updates.status {
        let entering_done = status == TaskStatus::Done && existing.status != TaskStatus::Done;
        updated.status = status;
        if entering_done {
            updated.completed_at = Some(stamp.clone());
            if updated.recurrence().is_some() {
                next_recurring = Some(next_occurrence(&updated, &stamp));
            }
        }
    }

    updated.updated_at = stamp;
    TaskUpdateOutcome {
        updated,
        next_recurring,
    }
}

/// Soft delete: the record is retained with `deletedAt` stamped, never
/// removed from the document.
pub fn soft_delete_task(existing: &Task, now: DateTime<Utc>) -> Task {
    let mut deleted = existing.clone();
    let stamp = timestamp(now);
    deleted.deleted_at = Some(stamp.clone());
    deleted.updated_at = stamp;
    deleted
}

fn next_occurrence(completed: &Task, stamp: &str) -> Task {
    let mut next = completed.clone();
    next.id = mint_id();
    next.status = TaskStatus::Inbox;
    next.completed_at = None;
    next.deleted_at = None;
    next.created_at = stamp.to_string();
    next.updated_at = stamp.to_string();
    next
}
