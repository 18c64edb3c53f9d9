#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::task::{Task, TaskStatus};
use crate::{is_rfc3339_timestamp, ContractViolation};

/// One project row. As with tasks, client-only fields ride in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub title: String,
    #[serde(rename = "deletedAt", default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Project {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// The whole tenant state: the unit of persistence. Whole-document read,
/// whole-document overwrite; collections default to empty so a fresh tenant
/// deserializes from `{}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppDocument {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub sections: Vec<Value>,
    #[serde(default)]
    pub areas: Vec<Value>,
    #[serde(default)]
    pub settings: Map<String, Value>,
}

/// Structural gate run on every inbound whole-document PUT and on every
/// outbound whole-document GET. Works on raw JSON so a corrupt on-disk file
/// is reported instead of silently re-shaped.
pub fn validate_app_data(candidate: &Value) -> Result<(), ContractViolation> {
    let Some(doc) = candidate.as_object() else {
        return Err(ContractViolation::InvalidValue {
            field: "document",
            reason: "must be a non-array object",
        });
    };

    for field in ["tasks", "projects"] {
        let Some(rows) = doc.get(field).and_then(Value::as_array) else {
            return Err(ContractViolation::InvalidEntry {
                field: field.to_string(),
                reason: "must be an array",
            });
        };
        for (idx, row) in rows.iter().enumerate() {
            validate_row(field, idx, row)?;
        }
    }

    for field in ["sections", "areas"] {
        if let Some(value) = doc.get(field) {
            if !value.is_array() {
                return Err(ContractViolation::InvalidEntry {
                    field: field.to_string(),
                    reason: "must be an array when present",
                });
            }
        }
    }

    if let Some(settings) = doc.get("settings") {
        if !settings.is_object() {
            return Err(ContractViolation::InvalidEntry {
                field: "settings".to_string(),
                reason: "must be a non-array object when present",
            });
        }
    }

    Ok(())
}

fn validate_row(collection: &str, idx: usize, row: &Value) -> Result<(), ContractViolation> {
    let Some(obj) = row.as_object() else {
        return Err(ContractViolation::InvalidEntry {
            field: format!("{collection}[{idx}]"),
            reason: "must be an object",
        });
    };
    for key in ["id", "title"] {
        if !obj.get(key).map_or(false, Value::is_string) {
            return Err(ContractViolation::InvalidEntry {
                field: format!("{collection}[{idx}].{key}"),
                reason: "must be a string",
            });
        }
    }
    if collection == "tasks" {
        if let Some(status) = obj.get("status") {
            let ok = status
                .as_str()
                .and_then(TaskStatus::parse)
                .is_some();
            if !ok {
                return Err(ContractViolation::InvalidEntry {
                    field: format!("{collection}[{idx}].status"),
                    reason: "is not a recognized task status",
                });
            }
        }
        for key in ["createdAt", "updatedAt"] {
            if let Some(stamp) = obj.get(key) {
                let ok = stamp.as_str().map_or(false, is_rfc3339_timestamp);
                if !ok {
                    return Err(ContractViolation::InvalidEntry {
                        field: format!("{collection}[{idx}].{key}"),
                        reason: "must be an RFC 3339 timestamp",
                    });
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minimal_doc() -> Value {
        json!({
            "tasks": [],
            "projects": [],
            "settings": {}
        })
    }

    #[test]
    fn minimal_document_is_valid() {
        assert!(validate_app_data(&minimal_doc()).is_ok());
    }

    #[test]
    fn non_object_documents_are_rejected() {
        assert!(validate_app_data(&json!([])).is_err());
        assert!(validate_app_data(&json!("doc")).is_err());
    }

    #[test]
    fn tasks_must_be_an_array() {
        let mut doc = minimal_doc();
        doc["tasks"] = json!({"id": "t1"});
        assert!(validate_app_data(&doc).is_err());
    }

    #[test]
    fn task_rows_need_string_id_and_title() {
        let mut doc = minimal_doc();
        doc["tasks"] = json!([{ "id": 7, "title": "x" }]);
        assert!(validate_app_data(&doc).is_err());
        doc["tasks"] = json!([{ "id": "t1", "title": "x" }]);
        assert!(validate_app_data(&doc).is_ok());
    }

    #[test]
    fn unknown_status_and_bad_timestamps_are_rejected() {
        let mut doc = minimal_doc();
        doc["tasks"] = json!([{ "id": "t1", "title": "x", "status": "urgent" }]);
        assert!(validate_app_data(&doc).is_err());
        doc["tasks"] = json!([{ "id": "t1", "title": "x", "createdAt": "last week" }]);
        assert!(validate_app_data(&doc).is_err());
    }

    #[test]
    fn settings_must_not_be_an_array() {
        let mut doc = minimal_doc();
        doc["settings"] = json!([1, 2]);
        assert!(validate_app_data(&doc).is_err());
    }

    #[test]
    fn valid_documents_round_trip_unchanged() {
        let raw = json!({
            "tasks": [{
                "id": "t1",
                "title": "Write report",
                "status": "next",
                "tags": ["work"],
                "contexts": ["@desk"],
                "createdAt": "2026-01-02T03:04:05Z",
                "updatedAt": "2026-01-02T03:04:05Z",
                "pushCount": 2
            }],
            "projects": [{ "id": "p1", "title": "Q1 report", "color": "#6B7280" }],
            "sections": [],
            "areas": [{ "id": "a1", "name": "Work", "order": 0 }],
            "settings": { "theme": "dark" }
        });
        assert!(validate_app_data(&raw).is_ok());
        let doc: AppDocument = serde_json::from_value(raw.clone()).unwrap();
        let back = serde_json::to_value(&doc).unwrap();
        assert!(validate_app_data(&back).is_ok());
        assert_eq!(back, raw);
    }
}
