//! File storage for uploaded photos.
//!
//! # Responsibility
//! - Persist raw upload bytes under a unique name.
//! - Read and overwrite stored files by their relative path.
//!
//! # Invariants
//! - Stored paths are relative to the store root and never contain `..` or
//!   separators from the client-supplied file name.
//! - Two saves never share a path, even for identical client file names.

use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use uuid::Uuid;

const FALLBACK_FILE_NAME: &str = "upload.bin";
const MAX_FILE_NAME_CHARS: usize = 96;

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug)]
pub enum StorageError {
    Io { path: PathBuf, source: io::Error },
    InvalidPath(String),
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "file store I/O on `{}`: {source}", path.display()),
            Self::InvalidPath(path) => write!(f, "invalid stored path `{path}`"),
        }
    }
}

impl Error for StorageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::InvalidPath(_) => None,
        }
    }
}

/// Write/read/overwrite contract consumed by feedback intake.
pub trait FileStore {
    /// Saves `bytes` under a fresh unique name derived from `file_name`.
    /// Returns the stored relative path.
    fn save(&self, file_name: &str, bytes: &[u8]) -> StorageResult<String>;
    fn read(&self, stored_path: &str) -> StorageResult<Vec<u8>>;
    fn overwrite(&self, stored_path: &str, bytes: &[u8]) -> StorageResult<()>;
}

impl<T: FileStore + ?Sized> FileStore for &T {
    fn save(&self, file_name: &str, bytes: &[u8]) -> StorageResult<String> {
        (**self).save(file_name, bytes)
    }

    fn read(&self, stored_path: &str) -> StorageResult<Vec<u8>> {
        (**self).read(stored_path)
    }

    fn overwrite(&self, stored_path: &str, bytes: &[u8]) -> StorageResult<()> {
        (**self).overwrite(stored_path, bytes)
    }
}

/// Filesystem-backed store rooted at one upload directory.
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    /// Creates the root directory when missing.
    pub fn open(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| StorageError::Io {
            path: root.clone(),
            source,
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of a stored relative path.
    pub fn resolve(&self, stored_path: &str) -> StorageResult<PathBuf> {
        let relative = Path::new(stored_path);
        let is_plain = !stored_path.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !is_plain {
            return Err(StorageError::InvalidPath(stored_path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

impl FileStore for LocalFileStore {
    fn save(&self, file_name: &str, bytes: &[u8]) -> StorageResult<String> {
        let stored_path = format!("{}_{}", Uuid::new_v4().simple(), sanitize_file_name(file_name));
        let target = self.root.join(&stored_path);
        fs::write(&target, bytes).map_err(|source| {
            error!(
                "event=file_save module=storage status=error path={} error={}",
                stored_path, source
            );
            StorageError::Io {
                path: target.clone(),
                source,
            }
        })?;
        info!(
            "event=file_save module=storage status=ok path={} bytes={}",
            stored_path,
            bytes.len()
        );
        Ok(stored_path)
    }

    fn read(&self, stored_path: &str) -> StorageResult<Vec<u8>> {
        let target = self.resolve(stored_path)?;
        fs::read(&target).map_err(|source| StorageError::Io {
            path: target,
            source,
        })
    }

    fn overwrite(&self, stored_path: &str, bytes: &[u8]) -> StorageResult<()> {
        let target = self.resolve(stored_path)?;
        fs::write(&target, bytes).map_err(|source| StorageError::Io {
            path: target,
            source,
        })
    }
}

/// Keeps the last path segment and replaces anything outside `[A-Za-z0-9._-]`.
pub fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_FILE_NAME_CHARS)
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        FALLBACK_FILE_NAME.to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::{sanitize_file_name, FileStore, LocalFileStore, StorageError};

    #[test]
    fn sanitize_strips_directories_and_odd_characters() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\photos\\road work.jpg"), "road_work.jpg");
        assert_eq!(sanitize_file_name(""), "upload.bin");
        assert_eq!(sanitize_file_name("..."), "upload.bin");
    }

    #[test]
    fn same_client_name_gets_distinct_paths() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::open(dir.path()).unwrap();

        let first = store.save("site.jpg", b"one").unwrap();
        let second = store.save("site.jpg", b"two").unwrap();

        assert_ne!(first, second);
        assert_eq!(store.read(&first).unwrap(), b"one");
        assert_eq!(store.read(&second).unwrap(), b"two");
    }

    #[test]
    fn overwrite_replaces_content_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::open(dir.path()).unwrap();

        let path = store.save("a.png", b"before").unwrap();
        store.overwrite(&path, b"after").unwrap();
        assert_eq!(store.read(&path).unwrap(), b"after");
    }

    #[test]
    fn resolve_rejects_parent_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::open(dir.path()).unwrap();

        let err = store.read("../outside.png").unwrap_err();
        assert!(matches!(err, StorageError::InvalidPath(_)));
    }
}
