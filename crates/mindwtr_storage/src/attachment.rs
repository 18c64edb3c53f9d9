#![forbid(unsafe_code)]

use std::fs;
use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;

use crate::StorageError;

/// Byte-level store for one tenant's attachment subtree. Every operation
/// re-resolves and re-checks containment from scratch; nothing about a path
/// is trusted from an earlier request, since the filesystem can change
/// between requests.
#[derive(Debug, Clone)]
pub struct AttachmentStore {
    root: PathBuf,
}

/// Normalizes a user-supplied attachment path into a clean, forward-slash
/// relative path. Each step is a hard gate: percent-decode, character
/// allow-list (backslashes rejected outright), then a segment walk that
/// refuses `.` and `..` even though the allow-list alone would admit them.
pub fn normalize_attachment_relative_path(raw: &str) -> Result<String, StorageError> {
    let decoded = percent_decode_str(raw)
        .decode_utf8()
        .map_err(|_| StorageError::InvalidPath {
            reason: "not valid UTF-8 after percent-decoding",
        })?;

    if decoded.trim().is_empty() {
        return Err(StorageError::InvalidPath {
            reason: "must not be empty",
        });
    }
    if decoded.contains('\\') {
        return Err(StorageError::InvalidPath {
            reason: "backslashes are not allowed",
        });
    }
    if !decoded
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '/'))
    {
        return Err(StorageError::InvalidPath {
            reason: "contains characters outside the allow-list",
        });
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.trim_matches('/').split('/') {
        if segment.is_empty() {
            continue;
        }
        if segment == "." || segment == ".." {
            return Err(StorageError::InvalidPath {
                reason: "path traversal segments are not allowed",
            });
        }
        segments.push(segment);
    }
    if segments.is_empty() {
        return Err(StorageError::InvalidPath {
            reason: "must name a file",
        });
    }
    Ok(segments.join("/"))
}

/// Containment check: the candidate must be the root itself or live
/// strictly below it. Component-wise comparison, so a sibling directory
/// sharing the root's name as a prefix (`root-evil`) never passes.
pub fn is_path_within_root(path: &Path, root: &Path) -> bool {
    path.starts_with(root)
}

impl AttachmentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        AttachmentStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Reads an attachment. Missing file, missing tenant root, or a path
    /// that resolves to a directory all report not-found.
    pub fn get(&self, raw_path: &str) -> Result<Vec<u8>, StorageError> {
        let rel = normalize_attachment_relative_path(raw_path)?;
        let canonical_root = match self.root.canonicalize() {
            Ok(root) => root,
            Err(_) => return Err(StorageError::NotFound),
        };
        let canonical = match canonical_root.join(&rel).canonicalize() {
            Ok(path) => path,
            Err(_) => return Err(StorageError::NotFound),
        };
        if !is_path_within_root(&canonical, &canonical_root) {
            return Err(StorageError::InvalidPath {
                reason: "resolves outside the attachment root",
            });
        }
        if !canonical.is_file() {
            return Err(StorageError::NotFound);
        }
        fs::read(&canonical).map_err(|source| StorageError::Io {
            op: "read attachment",
            source,
        })
    }

    /// Stores an attachment, creating intermediate directories. The parent
    /// directory is canonicalized again after creation and containment is
    /// re-checked before any bytes hit disk; the byte cap here is the
    /// authoritative one, whatever the request headers claimed.
    pub fn put(&self, raw_path: &str, bytes: &[u8], max_bytes: usize) -> Result<(), StorageError> {
        let rel = normalize_attachment_relative_path(raw_path)?;
        if bytes.len() > max_bytes {
            return Err(StorageError::TooLarge {
                limit_bytes: max_bytes,
            });
        }

        fs::create_dir_all(&self.root).map_err(|source| StorageError::Io {
            op: "create attachment root",
            source,
        })?;
        let canonical_root = self.root.canonicalize().map_err(|source| StorageError::Io {
            op: "canonicalize attachment root",
            source,
        })?;

        let candidate = canonical_root.join(&rel);
        let file_name = candidate
            .file_name()
            .ok_or(StorageError::InvalidPath {
                reason: "must name a file",
            })?
            .to_os_string();
        let parent = candidate.parent().unwrap_or(&canonical_root).to_path_buf();
        fs::create_dir_all(&parent).map_err(|source| StorageError::Io {
            op: "create attachment directory",
            source,
        })?;
        let canonical_parent = parent.canonicalize().map_err(|source| StorageError::Io {
            op: "canonicalize attachment directory",
            source,
        })?;
        if !is_path_within_root(&canonical_parent, &canonical_root) {
            return Err(StorageError::InvalidPath {
                reason: "resolves outside the attachment root",
            });
        }

        fs::write(canonical_parent.join(file_name), bytes).map_err(|source| StorageError::Io {
            op: "write attachment",
            source,
        })
    }

    /// Deletes an attachment. Deleting something that does not exist is
    /// success: the end state is the same.
    pub fn delete(&self, raw_path: &str) -> Result<(), StorageError> {
        let rel = normalize_attachment_relative_path(raw_path)?;
        let canonical_root = match self.root.canonicalize() {
            Ok(root) => root,
            Err(_) => return Ok(()),
        };
        let canonical = match canonical_root.join(&rel).canonicalize() {
            Ok(path) => path,
            Err(_) => return Ok(()),
        };
        if !is_path_within_root(&canonical, &canonical_root) {
            return Err(StorageError::InvalidPath {
                reason: "resolves outside the attachment root",
            });
        }
        if !canonical.is_file() {
            return Err(StorageError::InvalidPath {
                reason: "names a directory, not a file",
            });
        }
        match fs::remove_file(&canonical) {
            Ok(()) => Ok(()),
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io {
                op: "delete attachment",
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_nested_paths() {
        assert_eq!(
            normalize_attachment_relative_path("folder/file.txt").unwrap(),
            "folder/file.txt"
        );
        assert_eq!(
            normalize_attachment_relative_path("//notes/2026/plan.md//").unwrap(),
            "notes/2026/plan.md"
        );
    }

    #[test]
    fn rejects_traversal_in_every_spelling() {
        assert!(normalize_attachment_relative_path("../secret").is_err());
        assert!(normalize_attachment_relative_path("a/../b").is_err());
        assert!(normalize_attachment_relative_path("./a").is_err());
        // Single-encoded traversal decodes to dots and is caught by the
        // segment walk.
        assert!(normalize_attachment_relative_path("%2e%2e/secret").is_err());
        // Double-encoded traversal decodes to "%2e%2e", which fails the
        // character allow-list.
        assert!(normalize_attachment_relative_path("%252e%252e/secret").is_err());
    }

    #[test]
    fn rejects_backslashes_and_metacharacters() {
        assert!(normalize_attachment_relative_path("a\\b").is_err());
        assert!(normalize_attachment_relative_path("file?.txt").is_err());
        assert!(normalize_attachment_relative_path("sp ace.txt").is_err());
        assert!(normalize_attachment_relative_path("").is_err());
        assert!(normalize_attachment_relative_path("///").is_err());
    }

    #[test]
    fn containment_is_component_wise() {
        let root = Path::new("/data/att/abc");
        assert!(is_path_within_root(root, root));
        assert!(is_path_within_root(Path::new("/data/att/abc/x"), root));
        assert!(!is_path_within_root(Path::new("/data/att/abc-evil/x"), root));
        assert!(!is_path_within_root(Path::new("/data/att"), root));
    }
}
