//! Strongly-typed domain structures for stored course files.
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;

pub mod category;
pub mod filename;

pub use category::{ExtensionPolicy, FileCategory, PathSegment};
pub use filename::SanitizedFilename;

/// Positive identifier of a persisted entity (lecture, unit, user, ...).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct EntityId(i64);

impl EntityId {
    pub fn try_new(id: i64) -> Result<Self, TypeConstraintError> {
        if id <= 0 {
            return Err(TypeConstraintError::NonPositiveId(id));
        }
        Ok(Self(id))
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for EntityId {
    type Error = TypeConstraintError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::try_new(value)
    }
}

impl FromStr for EntityId {
    type Err = TypeConstraintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s
            .parse::<i64>()
            .map_err(|_| TypeConstraintError::InvalidId(s.to_string()))?;
        Self::try_new(id)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Absolute path to the upload root (e.g. `/var/lib/course-files`).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UploadRoot(PathBuf);

impl UploadRoot {
    pub fn try_new(path: PathBuf) -> Result<Self, TypeConstraintError> {
        if !path.is_absolute() {
            return Err(TypeConstraintError::RelativeUploadRoot(path));
        }
        Ok(Self(path))
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }

    pub fn join(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.0.join(relative)
    }
}

impl TryFrom<PathBuf> for UploadRoot {
    type Error = TypeConstraintError;

    fn try_from(value: PathBuf) -> Result<Self, Self::Error> {
        Self::try_new(value)
    }
}

impl From<UploadRoot> for PathBuf {
    fn from(value: UploadRoot) -> Self {
        value.0
    }
}

/// Identifier handed to clients, persisted in database columns and embedded in markdown.
///
/// Only [`crate::services::translator::PathTranslator`] converts between this and a
/// [`StoragePath`].
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ExternalUri(String);

impl ExternalUri {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path component of the URI, without query string or fragment.
    pub fn path(&self) -> &str {
        let end = self.0.find(['?', '#']).unwrap_or(self.0.len());
        &self.0[..end]
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<&str> for ExternalUri {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for ExternalUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Location of a file below the upload root on the local file system.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct StoragePath(PathBuf);

impl StoragePath {
    pub fn new(path: PathBuf) -> Self {
        Self(path)
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }

    pub fn file_name(&self) -> Option<&str> {
        self.0.file_name().and_then(|name| name.to_str())
    }
}

impl AsRef<Path> for StoragePath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl From<StoragePath> for PathBuf {
    fn from(value: StoragePath) -> Self {
        value.0
    }
}

/// One physical file. Moving or copying produces a new value.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StoredFile {
    category: FileCategory,
    ids: Vec<Option<EntityId>>,
    filename: SanitizedFilename,
    storage_path: StoragePath,
}

impl StoredFile {
    pub fn new(
        category: FileCategory,
        ids: Vec<Option<EntityId>>,
        filename: SanitizedFilename,
        storage_path: StoragePath,
    ) -> Self {
        Self {
            category,
            ids,
            filename,
            storage_path,
        }
    }

    pub fn category(&self) -> FileCategory {
        self.category
    }

    /// Embedded entity ids in layout order; `None` marks a placeholder slot.
    pub fn ids(&self) -> &[Option<EntityId>] {
        &self.ids
    }

    pub fn filename(&self) -> &SanitizedFilename {
        &self.filename
    }

    pub fn storage_path(&self) -> &StoragePath {
        &self.storage_path
    }

    pub fn into_storage_path(self) -> StoragePath {
        self.storage_path
    }
}

#[derive(Debug, Error)]
pub enum TypeConstraintError {
    #[error("entity id must be positive, got {0}")]
    NonPositiveId(i64),
    #[error("'{0}' is not a positive integer")]
    InvalidId(String),
    #[error("upload root must be absolute: {0}")]
    RelativeUploadRoot(PathBuf),
    #[error("filename cannot be missing")]
    MissingFilename,
    #[error("'{0}' is not a sanitized file name")]
    UnsanitizedFilename(String),
    #[error("file name '{0}' has no usable characters")]
    EmptyFilename(String),
    #[error("unknown file category '{0}'")]
    UnknownCategory(String),
}
