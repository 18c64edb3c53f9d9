#![forbid(unsafe_code)]

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use mindwtr_contracts::AppDocument;
use serde_json::Value;

use crate::StorageError;

/// The empty workspace a brand-new tenant sees on first access.
pub fn default_document() -> Value {
    serde_json::to_value(AppDocument::default()).unwrap_or_else(|_| Value::Object(Default::default()))
}

/// Reads the tenant's document as raw JSON. Missing, unreadable, or
/// unparseable files all synthesize the default document so a fresh tenant
/// transparently gets an empty workspace; structural validity is the
/// caller's gate, not this function's.
pub fn load_document_value(path: &Path) -> Value {
    match fs::read_to_string(path) {
        Ok(content) => parse_json_relaxed(&content).unwrap_or_else(default_document),
        Err(_) => default_document(),
    }
}

/// Serializes and atomically replaces the tenant's document, creating
/// parent directories as needed. Write-to-tmp then rename, so a reader
/// never observes a half-written file.
pub fn save_document(path: &Path, document: &AppDocument) -> Result<(), StorageError> {
    let content = serde_json::to_string_pretty(document).map_err(StorageError::Serialize)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| StorageError::Io {
            op: "create document directory",
            source,
        })?;
    }

    let tmp_path = path.with_extension("json.tmp");
    {
        let mut file = File::create(&tmp_path).map_err(|source| StorageError::Io {
            op: "create temp document file",
            source,
        })?;
        file.write_all(content.as_bytes())
            .map_err(|source| StorageError::Io {
                op: "write document",
                source,
            })?;
        file.sync_all().map_err(|source| StorageError::Io {
            op: "sync document",
            source,
        })?;
    }

    if cfg!(windows) && path.exists() {
        // Windows refuses to rename over an existing file.
        fs::remove_file(path).map_err(|source| StorageError::Io {
            op: "remove previous document",
            source,
        })?;
    }
    fs::rename(&tmp_path, path).map_err(|source| StorageError::Io {
        op: "replace document",
        source,
    })
}

fn sanitize_json_text(raw: &str) -> &str {
    // Strip BOM and trailing NULs left behind by partial writes or file
    // replication quirks.
    let mut text = raw.trim_start_matches('\u{FEFF}').trim_end();
    text = text.trim_end_matches('\u{0}');
    text
}

/// Strict parse first; failing that, parse the first JSON value and ignore
/// trailing bytes, which keeps a mid-write replacement from looking like a
/// lost document.
fn parse_json_relaxed(raw: &str) -> Option<Value> {
    let sanitized = sanitize_json_text(raw);
    if sanitized.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str::<Value>(sanitized) {
        return Some(value);
    }
    let start = sanitized.find(|c| c == '{' || c == '[')?;
    let mut de = serde_json::Deserializer::from_str(&sanitized[start..]);
    serde::Deserialize::deserialize(&mut de).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relaxed_parse_accepts_bom_and_trailing_garbage() {
        let value = parse_json_relaxed("\u{FEFF}{\"tasks\":[]}\u{0}\u{0}").unwrap();
        assert!(value.get("tasks").is_some());
        let value = parse_json_relaxed("{\"tasks\":[]}{half-writ").unwrap();
        assert!(value.get("tasks").is_some());
    }

    #[test]
    fn relaxed_parse_gives_up_on_empty_input() {
        assert!(parse_json_relaxed("").is_none());
        assert!(parse_json_relaxed("\u{FEFF}").is_none());
    }

    #[test]
    fn default_document_has_the_full_shape() {
        let value = default_document();
        assert!(value["tasks"].is_array());
        assert!(value["projects"].is_array());
        assert!(value["settings"].is_object());
    }
}
