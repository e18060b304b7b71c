//! Storage layout, naming and validation for uploaded course files.
pub mod domain;
pub mod models;
pub mod services;

pub use domain::{
    EntityId, ExternalUri, FileCategory, SanitizedFilename, StoragePath, StoredFile, UploadRoot,
};
pub use services::files::{DeletionScheduler, FileService, Upload};
pub use services::{ServiceError, ServiceResult};

/// Upload root used when the configuration does not name one.
pub const DEFAULT_UPLOAD_PATH: &str = "./upload/";
