#![forbid(unsafe_code)]

use mindwtr_contracts::{AppDocument, Project, Task};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResults {
    pub tasks: Vec<Task>,
    pub projects: Vec<Project>,
}

/// Case-insensitive substring search over task titles/descriptions and
/// project titles. Soft-deleted records never match.
pub fn search_all(document: &AppDocument, query: &str) -> SearchResults {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return SearchResults::default();
    }

    let tasks = document
        .tasks
        .iter()
        .filter(|task| !task.is_deleted() && task_matches(task, &needle))
        .cloned()
        .collect();
    let projects = document
        .projects
        .iter()
        .filter(|project| !project.is_deleted() && project.title.to_lowercase().contains(&needle))
        .cloned()
        .collect();

    SearchResults { tasks, projects }
}

fn task_matches(task: &Task, needle: &str) -> bool {
    if task.title.to_lowercase().contains(needle) {
        return true;
    }
    task.description
        .as_deref()
        .map_or(false, |d| d.to_lowercase().contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::update::new_task;
    use chrono::{TimeZone, Utc};
    use mindwtr_contracts::TaskStatus;

    fn doc_with_tasks() -> AppDocument {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
        let mut doc = AppDocument::default();
        doc.tasks.push(new_task(
            "Renew passport".to_string(),
            TaskStatus::Next,
            Vec::new(),
            Vec::new(),
            now,
        ));
        let mut described = new_task(
            "Weekly review".to_string(),
            TaskStatus::Inbox,
            Vec::new(),
            Vec::new(),
            now,
        );
        described.description = Some("go through the passport folder".to_string());
        doc.tasks.push(described);
        doc.projects.push(Project {
            id: "p1".to_string(),
            title: "Passport renewal".to_string(),
            deleted_at: None,
            extra: serde_json::Map::new(),
        });
        doc
    }

    #[test]
    fn matches_titles_and_descriptions_case_insensitively() {
        let results = search_all(&doc_with_tasks(), "PASSPORT");
        assert_eq!(results.tasks.len(), 2);
        assert_eq!(results.projects.len(), 1);
    }

    #[test]
    fn empty_query_matches_nothing() {
        let results = search_all(&doc_with_tasks(), "   ");
        assert!(results.tasks.is_empty());
        assert!(results.projects.is_empty());
    }

    #[test]
    fn deleted_records_never_match() {
        let mut doc = doc_with_tasks();
        for task in &mut doc.tasks {
            task.deleted_at = Some("2026-03-02T00:00:00Z".to_string());
        }
        let results = search_all(&doc, "passport");
        assert!(results.tasks.is_empty());
        assert_eq!(results.projects.len(), 1);
    }
}
