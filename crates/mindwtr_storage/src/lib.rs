#![forbid(unsafe_code)]

//! Per-tenant persistence: one JSON document and one attachment subtree per
//! tenant key. The document side is whole-file read / whole-file overwrite;
//! the attachment side is byte-level I/O behind a containment-checked path
//! resolver.

pub mod attachment;
pub mod document;

pub use attachment::{
    is_path_within_root, normalize_attachment_relative_path, AttachmentStore,
};
pub use document::{default_document, load_document_value, save_document};

#[derive(Debug)]
pub enum StorageError {
    /// The supplied attachment path failed normalization or containment.
    InvalidPath { reason: &'static str },
    /// The requested attachment does not exist.
    NotFound,
    /// The attachment body exceeds the configured byte cap.
    TooLarge { limit_bytes: usize },
    /// Disk I/O failed mid-operation.
    Io {
        op: &'static str,
        source: std::io::Error,
    },
    /// The document could not be serialized for writing.
    Serialize(serde_json::Error),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::InvalidPath { reason } => write!(f, "invalid attachment path: {reason}"),
            StorageError::NotFound => write!(f, "attachment not found"),
            StorageError::TooLarge { limit_bytes } => {
                write!(f, "attachment exceeds the {limit_bytes} byte limit")
            }
            StorageError::Io { op, source } => write!(f, "{op} failed: {source}"),
            StorageError::Serialize(err) => write!(f, "document serialization failed: {err}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Io { source, .. } => Some(source),
            StorageError::Serialize(err) => Some(err),
            _ => None,
        }
    }
}
