#![forbid(unsafe_code)]

//! The task domain library consumed by the sync endpoint: quick-add
//! parsing, update application (including the recurring follow-up), and
//! search. Pure functions over the contract types; no I/O here.

pub mod quickadd;
pub mod search;
pub mod update;

pub use quickadd::{parse_quick_add, QuickAdd};
pub use search::{search_all, SearchResults};
pub use update::{apply_task_updates, new_task, soft_delete_task, TaskUpdateOutcome};
