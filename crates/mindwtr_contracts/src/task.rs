#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{is_rfc3339_timestamp, ContractViolation, Validate};

/// Closed task lifecycle enumeration. Any other string is rejected at the
/// boundary, never coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Inbox,
    Next,
    Waiting,
    Someday,
    Reference,
    Done,
    Archived,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 7] = [
        TaskStatus::Inbox,
        TaskStatus::Next,
        TaskStatus::Waiting,
        TaskStatus::Someday,
        TaskStatus::Reference,
        TaskStatus::Done,
        TaskStatus::Archived,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Inbox => "inbox",
            TaskStatus::Next => "next",
            TaskStatus::Waiting => "waiting",
            TaskStatus::Someday => "someday",
            TaskStatus::Reference => "reference",
            TaskStatus::Done => "done",
            TaskStatus::Archived => "archived",
        }
    }

    pub fn parse(raw: &str) -> Option<TaskStatus> {
        Self::ALL.into_iter().find(|s| s.as_str() == raw)
    }

    /// Done and archived tasks drop out of default listings.
    pub fn is_closed(self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Archived)
    }
}

fn default_status() -> TaskStatus {
    TaskStatus::Inbox
}

/// One task row inside a tenant's [`crate::AppDocument`]. Fields the sync
/// clients exchange but the server never interprets ride along in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default = "default_status")]
    pub status: TaskStatus,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub contexts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "projectId", default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(rename = "createdAt", default, skip_serializing_if = "String::is_empty")]
    pub created_at: String,
    #[serde(rename = "updatedAt", default, skip_serializing_if = "String::is_empty")]
    pub updated_at: String,
    #[serde(
        rename = "completedAt",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub completed_at: Option<String>,
    #[serde(rename = "deletedAt", default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Task {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Recurrence rule as stored by the clients, if any.
    pub fn recurrence(&self) -> Option<&Value> {
        self.extra.get("recurrence").filter(|v| !v.is_null())
    }
}

impl Validate for Task {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.id.trim().is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "task.id",
                reason: "must not be empty",
            });
        }
        if self.title.trim().is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "task.title",
                reason: "must not be empty",
            });
        }
        for (field, value) in [
            ("task.createdAt", &self.created_at),
            ("task.updatedAt", &self.updated_at),
        ] {
            if !value.is_empty() && !is_rfc3339_timestamp(value) {
                return Err(ContractViolation::InvalidValue {
                    field,
                    reason: "must be an RFC 3339 timestamp",
                });
            }
        }
        if let Some(deleted_at) = &self.deleted_at {
            if !is_rfc3339_timestamp(deleted_at) {
                return Err(ContractViolation::InvalidValue {
                    field: "task.deletedAt",
                    reason: "must be an RFC 3339 timestamp",
                });
            }
        }
        Ok(())
    }
}

/// Closed partial-update payload for PATCH and the status shortcut routes.
/// Every field is optional; absent means "leave unchanged".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "projectId", default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contexts: Option<Vec<String>>,
    #[serde(rename = "dueDate", default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(rename = "startTime", default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Value>,
    #[serde(rename = "reviewAt", default, skip_serializing_if = "Option::is_none")]
    pub review_at: Option<String>,
}

impl TaskUpdate {
    pub fn with_status(status: TaskStatus) -> Self {
        TaskUpdate {
            status: Some(status),
            ..TaskUpdate::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == TaskUpdate::default()
    }
}

/// Title gate applied on create and on PATCH: trimmed non-empty and within
/// the configured length cap (counted in characters, not bytes).
pub fn validate_task_title(title: &str, max_len: usize) -> Result<(), ContractViolation> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(ContractViolation::InvalidValue {
            field: "task.title",
            reason: "must not be empty",
        });
    }
    if trimmed.chars().count() > max_len {
        return Err(ContractViolation::InvalidValue {
            field: "task.title",
            reason: "exceeds the configured length cap",
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_strings() {
        for status in TaskStatus::ALL {
            assert_eq!(TaskStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(TaskStatus::parse("urgent"), None);
        assert_eq!(TaskStatus::parse("Done"), None);
    }

    #[test]
    fn task_serde_preserves_unknown_fields() {
        let raw = serde_json::json!({
            "id": "t1",
            "title": "Call the bank",
            "status": "next",
            "createdAt": "2026-01-02T03:04:05Z",
            "updatedAt": "2026-01-02T03:04:05Z",
            "pushCount": 3,
            "isFocusedToday": true
        });
        let task: Task = serde_json::from_value(raw).unwrap();
        assert_eq!(task.status, TaskStatus::Next);
        assert_eq!(task.extra.get("pushCount"), Some(&serde_json::json!(3)));
        let back = serde_json::to_value(&task).unwrap();
        assert_eq!(back.get("isFocusedToday"), Some(&serde_json::json!(true)));
    }

    #[test]
    fn task_without_status_defaults_to_inbox() {
        let task: Task = serde_json::from_value(serde_json::json!({
            "id": "t1",
            "title": "Sort inbox"
        }))
        .unwrap();
        assert_eq!(task.status, TaskStatus::Inbox);
    }

    #[test]
    fn invalid_status_fails_task_update_parse() {
        let err = serde_json::from_value::<TaskUpdate>(serde_json::json!({
            "status": "urgent"
        }));
        assert!(err.is_err());
    }

    #[test]
    fn task_rejects_non_iso_timestamps() {
        let task = Task {
            id: "t1".to_string(),
            title: "x".to_string(),
            status: TaskStatus::Inbox,
            tags: Vec::new(),
            contexts: Vec::new(),
            description: None,
            project_id: None,
            created_at: "yesterday".to_string(),
            updated_at: String::new(),
            completed_at: None,
            deleted_at: None,
            extra: Map::new(),
        };
        assert!(task.validate().is_err());
    }

    #[test]
    fn title_cap_counts_characters() {
        assert!(validate_task_title("  ", 10).is_err());
        assert!(validate_task_title("héllo", 5).is_ok());
        assert!(validate_task_title("toolong", 5).is_err());
    }
}
