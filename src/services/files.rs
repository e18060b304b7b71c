use std::fmt;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::{
    EntityId, ExternalUri, FileCategory, SanitizedFilename, StoragePath, StoredFile,
    TypeConstraintError, UploadRoot,
};
use crate::models::config::StorageConfig;
use crate::services::guard::{assert_within_root, is_within_root};
use crate::services::naming::FilenameGenerator;
use crate::services::store::FileStore;
use crate::services::translator::PathTranslator;
use crate::services::validation::UploadValidator;
use crate::services::{ServiceError, ServiceResult};

/// Deferred deletion, implemented by the hosting application's scheduler.
pub trait DeletionScheduler: Send + Sync {
    fn schedule_for_deletion(&self, path: &StoragePath, delay: Duration);
}

/// Incoming upload: declared original name and length plus the byte stream.
pub struct Upload<R> {
    pub file_name: Option<String>,
    pub size: u64,
    pub content: R,
}

impl<R: Read> Upload<R> {
    pub fn new(file_name: Option<String>, size: u64, content: R) -> Self {
        Self {
            file_name,
            size,
            content,
        }
    }
}

/// Entry point for storing and locating course files.
#[derive(Clone)]
pub struct FileService {
    translator: PathTranslator,
    validator: UploadValidator,
    generator: FilenameGenerator,
    store: FileStore,
    scheduler: Option<Arc<dyn DeletionScheduler>>,
}

impl FileService {
    pub fn new(upload_root: UploadRoot, validator: UploadValidator) -> Self {
        Self {
            translator: PathTranslator::new(upload_root),
            validator,
            generator: FilenameGenerator::new(),
            store: FileStore::new(),
            scheduler: None,
        }
    }

    pub fn from_config(config: &StorageConfig) -> Result<Self, TypeConstraintError> {
        Ok(Self::new(
            config.upload_root()?,
            UploadValidator::from_config(config),
        ))
    }

    pub fn with_generator(mut self, generator: FilenameGenerator) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_scheduler(mut self, scheduler: Arc<dyn DeletionScheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn translator(&self) -> &PathTranslator {
        &self.translator
    }

    pub fn store(&self) -> &FileStore {
        &self.store
    }

    /// Sanitize, validate, name, persist and encode an upload.
    pub fn save_upload<R: Read>(
        &self,
        category: FileCategory,
        ids: &[Option<EntityId>],
        keep_original: bool,
        upload: Upload<R>,
    ) -> ServiceResult<ExternalUri> {
        let Upload {
            file_name,
            size,
            mut content,
        } = upload;

        let sanitized = SanitizedFilename::sanitize(file_name.as_deref())
            .map_err(|_| ServiceError::MissingFilename)?;
        self.validator.validate(category, &sanitized, size)?;

        let keep_original = keep_original || category.keeps_original_name();
        let generated =
            self.generator
                .generate(category.filename_prefix(), &sanitized, keep_original);
        let storage_path = self.translator.storage_path(category, ids, &generated)?;
        let limit = self.validator.size_limit_for(Some(sanitized.as_str()));
        self.store.save_within(&mut content, &storage_path, limit)?;

        let uri = PathTranslator::encode(category, ids, &generated)?;
        log::info!("Stored {category} upload as {uri}");
        Ok(uri)
    }

    /// Storage path for an external URI of `category`.
    pub fn resolve(&self, uri: &ExternalUri, category: FileCategory) -> ServiceResult<StoragePath> {
        self.translator.resolve(uri, category)
    }

    /// External URI for a file already stored below the upload root.
    pub fn external_uri_for(
        &self,
        storage_path: &Path,
        category: FileCategory,
    ) -> ServiceResult<ExternalUri> {
        self.translator.external_uri_for(storage_path, category)
    }

    /// Copy a stored, non-temporary file into another entity's directory under a new name.
    ///
    /// Returns `Ok(None)` for files in the temporary area, which are moved by
    /// their owners instead of copied.
    pub fn copy_existing_file(
        &self,
        source: &StoragePath,
        category: FileCategory,
        ids: &[Option<EntityId>],
    ) -> ServiceResult<Option<StoredFile>> {
        assert_within_root(source.as_path(), self.translator.root().as_path())?;
        let temp_dir = self.translator.category_dir(FileCategory::TemporaryUpload);
        if is_within_root(source.as_path(), &temp_dir) {
            return Ok(None);
        }

        let original = SanitizedFilename::sanitize(source.file_name())
            .map_err(|_| ServiceError::MissingFilename)?;
        let generated = self.generator.generate(
            category.filename_prefix(),
            &original,
            category.keeps_original_name(),
        );
        let target = self.translator.storage_path(category, ids, &generated)?;
        let copied = self.store.copy_file(source.as_path(), &target)?;

        Ok(Some(StoredFile::new(
            category,
            ids.to_vec(),
            generated,
            copied,
        )))
    }

    /// Hand a stored file to the deletion scheduler.
    pub fn schedule_for_deletion(&self, path: &StoragePath, delay: Duration) -> ServiceResult<()> {
        assert_within_root(path.as_path(), self.translator.root().as_path())?;
        match &self.scheduler {
            Some(scheduler) => scheduler.schedule_for_deletion(path, delay),
            None => log::warn!(
                "No deletion scheduler configured, keeping {}",
                path.as_path().display()
            ),
        }
        Ok(())
    }
}

impl fmt::Debug for FileService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileService")
            .field("translator", &self.translator)
            .field("validator", &self.validator)
            .field("scheduler", &self.scheduler.is_some())
            .finish_non_exhaustive()
    }
}
