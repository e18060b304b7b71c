//! Conversion between external URIs and storage paths.
use std::path::{Component, Path, PathBuf};

use crate::domain::category::PLACEHOLDER_ID;
use crate::domain::{
    EntityId, ExternalUri, FileCategory, PathSegment, SanitizedFilename, StoragePath, StoredFile,
    UploadRoot,
};
use crate::services::guard::{assert_no_traversal, assert_within_root, normalize_path};
use crate::services::{ServiceError, ServiceResult};

/// Bidirectional mapping between [`ExternalUri`] and [`StoragePath`].
///
/// Both directions walk [`FileCategory::layout`], so the URI `attachments/lecture/4/a.pdf`
/// is stored at `<root>/attachments/lecture/4/a.pdf`.
#[derive(Clone, Debug)]
pub struct PathTranslator {
    root: UploadRoot,
}

impl PathTranslator {
    pub fn new(root: UploadRoot) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &UploadRoot {
        &self.root
    }

    /// Base directory of a category, e.g. `<root>/attachments/lecture`.
    pub fn category_dir(&self, category: FileCategory) -> PathBuf {
        self.root.join(category.base_path())
    }

    /// External URI for `filename` stored under `ids`. `None` ids become placeholders.
    pub fn encode(
        category: FileCategory,
        ids: &[Option<EntityId>],
        filename: &SanitizedFilename,
    ) -> ServiceResult<ExternalUri> {
        ensure_file_name(category, filename)?;
        let mut segments = Self::directory_segments(category, ids)?;
        segments.push(filename.to_string());
        Ok(ExternalUri::new(segments.join("/")))
    }

    /// Decode an external URI into the stored file it names.
    ///
    /// The URI must be in normal form and follow the category layout exactly;
    /// the resulting path is checked against the category directory.
    pub fn decode(&self, uri: &ExternalUri, category: FileCategory) -> ServiceResult<StoredFile> {
        assert_no_traversal(uri)?;

        let path = uri.path();
        let path = path.strip_prefix('/').unwrap_or(path);
        let segments: Vec<&str> = path.split('/').collect();
        let layout = category.layout();

        let Some((raw_filename, directories)) = segments.split_last() else {
            return Err(ServiceError::path_parsing(category, "path", "empty path"));
        };
        if directories.len() != layout.len() {
            return Err(ServiceError::path_parsing(
                category,
                "path",
                format!(
                    "expected {} segments, found {}",
                    layout.len() + 1,
                    segments.len()
                ),
            ));
        }

        let mut ids = Vec::with_capacity(category.id_count());
        for (expected, actual) in layout.iter().zip(directories) {
            match expected {
                PathSegment::Literal(literal) => {
                    if literal != actual {
                        return Err(ServiceError::path_parsing(
                            category,
                            *literal,
                            format!("expected '{literal}', found '{actual}'"),
                        ));
                    }
                }
                PathSegment::Id(name) => ids.push(parse_id(category, name, actual)?),
            }
        }

        let filename = SanitizedFilename::parse(raw_filename).map_err(|err| {
            ServiceError::path_parsing(category, "filename", err.to_string())
        })?;

        let storage_path = self.storage_path(category, &ids, &filename)?;
        Ok(StoredFile::new(category, ids, filename, storage_path))
    }

    /// Storage path for an external URI, used before opening a file for download.
    pub fn resolve(&self, uri: &ExternalUri, category: FileCategory) -> ServiceResult<StoragePath> {
        self.decode(uri, category).map(StoredFile::into_storage_path)
    }

    /// Storage path for `filename` stored under `ids`, checked against the category directory.
    pub fn storage_path(
        &self,
        category: FileCategory,
        ids: &[Option<EntityId>],
        filename: &SanitizedFilename,
    ) -> ServiceResult<StoragePath> {
        ensure_file_name(category, filename)?;
        let path = self
            .directory_for(category, ids)?
            .join(filename.as_str());
        assert_within_root(&path, &self.category_dir(category))?;
        Ok(StoragePath::new(path))
    }

    /// Directory holding the files of one entity of `category`.
    pub fn directory_for(
        &self,
        category: FileCategory,
        ids: &[Option<EntityId>],
    ) -> ServiceResult<PathBuf> {
        let segments = Self::directory_segments(category, ids)?;
        Ok(segments
            .iter()
            .fold(self.root.as_path().to_path_buf(), |path, segment| {
                path.join(segment)
            }))
    }

    /// External URI for a file that already lives below the upload root.
    pub fn external_uri_for(
        &self,
        storage_path: &Path,
        category: FileCategory,
    ) -> ServiceResult<ExternalUri> {
        let normalized = normalize_path(storage_path);
        assert_within_root(&normalized, &self.category_dir(category))?;

        let relative = normalized
            .strip_prefix(normalize_path(self.root.as_path()))
            .map_err(|_| {
                ServiceError::Security(format!(
                    "{} is outside the upload root",
                    storage_path.display()
                ))
            })?;

        let mut segments = Vec::new();
        for component in relative.components() {
            let Component::Normal(segment) = component else {
                return Err(ServiceError::path_parsing(
                    category,
                    "path",
                    "unexpected path component",
                ));
            };
            let segment = segment.to_str().ok_or_else(|| {
                ServiceError::path_parsing(category, "path", "path is not valid UTF-8")
            })?;
            segments.push(segment);
        }

        let stored = self.decode(&ExternalUri::new(segments.join("/")), category)?;
        Self::encode(category, stored.ids(), stored.filename())
    }

    fn directory_segments(
        category: FileCategory,
        ids: &[Option<EntityId>],
    ) -> ServiceResult<Vec<String>> {
        if ids.len() != category.id_count() {
            return Err(ServiceError::InvalidIdCount {
                category,
                expected: category.id_count(),
                actual: ids.len(),
            });
        }

        let mut ids = ids.iter();
        Ok(category
            .layout()
            .iter()
            .map(|segment| match segment {
                PathSegment::Literal(literal) => (*literal).to_string(),
                PathSegment::Id(_) => match ids.next() {
                    Some(Some(id)) => id.to_string(),
                    _ => PLACEHOLDER_ID.to_string(),
                },
            })
            .collect())
    }
}

fn parse_id(category: FileCategory, name: &str, raw: &str) -> ServiceResult<Option<EntityId>> {
    if raw == PLACEHOLDER_ID {
        return Ok(None);
    }
    raw.parse::<EntityId>()
        .map(Some)
        .map_err(|err| ServiceError::path_parsing(category, name, err.to_string()))
}

fn ensure_file_name(category: FileCategory, filename: &SanitizedFilename) -> ServiceResult<()> {
    if filename.is_blank() {
        return Err(ServiceError::path_parsing(
            category,
            "filename",
            format!("'{filename}' cannot name a stored file"),
        ));
    }
    Ok(())
}
