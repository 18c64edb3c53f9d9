#![forbid(unsafe_code)]

pub mod document;
pub mod task;

pub use document::{validate_app_data, AppDocument, Project};
pub use task::{validate_task_title, Task, TaskStatus, TaskUpdate};

#[derive(Debug, Clone, PartialEq)]
pub enum ContractViolation {
    InvalidValue {
        field: &'static str,
        reason: &'static str,
    },
    InvalidEntry {
        field: String,
        reason: &'static str,
    },
}

impl ContractViolation {
    pub fn field(&self) -> &str {
        match self {
            ContractViolation::InvalidValue { field, .. } => field,
            ContractViolation::InvalidEntry { field, .. } => field,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            ContractViolation::InvalidValue { reason, .. } => reason,
            ContractViolation::InvalidEntry { reason, .. } => reason,
        }
    }
}

impl std::fmt::Display for ContractViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field(), self.reason())
    }
}

impl std::error::Error for ContractViolation {}

pub trait Validate {
    fn validate(&self) -> Result<(), ContractViolation>;
}

/// RFC 3339 timestamp check shared by task and document validation.
pub fn is_rfc3339_timestamp(raw: &str) -> bool {
    chrono::DateTime::parse_from_rfc3339(raw).is_ok()
}
