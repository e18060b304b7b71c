//! Extension allow-lists and size ceilings for uploads.
use crate::domain::category::VIDEO_EXTENSIONS;
use crate::domain::filename::extension_of;
use crate::domain::{ExtensionPolicy, FileCategory, SanitizedFilename};
use crate::models::config::StorageConfig;
use crate::services::{ServiceError, ServiceResult};

/// Default ceiling for non-video uploads.
pub const MAX_FILE_SIZE: u64 = 20 * 1024 * 1024;

/// Default ceiling for video uploads.
pub const MAX_VIDEO_FILE_SIZE: u64 = 200 * 1024 * 1024;

/// Check the extension of `filename` against an allow-list, ignoring case.
pub fn validate_extension(filename: &str, policy: ExtensionPolicy) -> ServiceResult<()> {
    let extension = extension_of(filename);
    if policy.allows(extension) {
        return Ok(());
    }
    Err(ServiceError::UnsupportedFileType {
        extension: extension.to_string(),
        allowed: policy.allowed_extensions().join(", "),
    })
}

/// Fail when `size` exceeds `limit`.
pub fn validate_size(size: u64, limit: u64) -> ServiceResult<()> {
    if size > limit {
        return Err(ServiceError::PayloadTooLarge { size, limit });
    }
    Ok(())
}

pub fn is_video_file(filename: &str) -> bool {
    let extension = extension_of(filename);
    VIDEO_EXTENSIONS
        .iter()
        .any(|video| video.eq_ignore_ascii_case(extension))
}

/// Category-aware upload checks with configured size ceilings.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct UploadValidator {
    max_file_size: u64,
    max_video_file_size: u64,
}

impl UploadValidator {
    pub const fn new(max_file_size: u64, max_video_file_size: u64) -> Self {
        Self {
            max_file_size,
            max_video_file_size,
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(config.max_file_size, config.max_video_file_size)
    }

    /// Ceiling picked by extension. Without a name the stricter limit applies.
    pub fn size_limit_for(&self, filename: Option<&str>) -> u64 {
        match filename {
            Some(name) if is_video_file(name) => self.max_video_file_size,
            _ => self.max_file_size,
        }
    }

    pub fn validate_size_for(&self, filename: Option<&str>, size: u64) -> ServiceResult<()> {
        validate_size(size, self.size_limit_for(filename))
    }

    /// Run the extension and size checks for an upload into `category`.
    pub fn validate(
        &self,
        category: FileCategory,
        filename: &SanitizedFilename,
        size: u64,
    ) -> ServiceResult<()> {
        validate_extension(filename.as_str(), category.extension_policy())?;
        self.validate_size_for(Some(filename.as_str()), size)
    }
}

impl Default for UploadValidator {
    fn default() -> Self {
        Self::new(MAX_FILE_SIZE, MAX_VIDEO_FILE_SIZE)
    }
}
