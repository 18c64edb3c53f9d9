#![forbid(unsafe_code)]

use mindwtr_contracts::{validate_app_data, AppDocument};
use mindwtr_storage::{load_document_value, save_document};

#[test]
fn missing_file_synthesizes_an_empty_workspace() {
    let dir = tempfile::tempdir().unwrap();
    let value = load_document_value(&dir.path().join("no-such-tenant.json"));
    assert!(validate_app_data(&value).is_ok());
    assert_eq!(value["tasks"].as_array().map(Vec::len), Some(0));
    assert_eq!(value["projects"].as_array().map(Vec::len), Some(0));
}

#[test]
fn corrupt_file_also_synthesizes_the_default() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tenant.json");
    std::fs::write(&path, "not json at all").unwrap();
    let value = load_document_value(&path);
    assert!(validate_app_data(&value).is_ok());
}

#[test]
fn save_then_load_round_trips_and_stays_valid() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/dir/tenant.json");

    let doc: AppDocument = serde_json::from_value(serde_json::json!({
        "tasks": [{
            "id": "t1",
            "title": "Pay rent",
            "status": "next",
            "createdAt": "2026-02-01T08:00:00Z",
            "updatedAt": "2026-02-01T08:00:00Z",
            "dueDate": "2026-02-28"
        }],
        "projects": [],
        "settings": { "theme": "dark" }
    }))
    .unwrap();

    save_document(&path, &doc).unwrap();
    let value = load_document_value(&path);
    assert!(validate_app_data(&value).is_ok());

    let reloaded: AppDocument = serde_json::from_value(value).unwrap();
    assert_eq!(reloaded, doc);
}

#[test]
fn save_replaces_the_previous_document_whole() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tenant.json");

    let first: AppDocument = serde_json::from_value(serde_json::json!({
        "tasks": [{ "id": "t1", "title": "one" }],
        "projects": []
    }))
    .unwrap();
    save_document(&path, &first).unwrap();

    let second = AppDocument::default();
    save_document(&path, &second).unwrap();

    let value = load_document_value(&path);
    assert_eq!(value["tasks"].as_array().map(Vec::len), Some(0));
    // No stray tmp file left behind.
    assert!(!path.with_extension("json.tmp").exists());
}

#[test]
fn document_with_bom_and_trailing_garbage_still_loads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tenant.json");
    std::fs::write(
        &path,
        "\u{FEFF}{\"tasks\":[],\"projects\":[],\"settings\":{}}\u{0}\u{0}",
    )
    .unwrap();
    let value = load_document_value(&path);
    assert!(validate_app_data(&value).is_ok());
}
