//! Configuration model loaded from external sources.
use std::path::{self, PathBuf};

use serde::Deserialize;
use validator::Validate;

use crate::DEFAULT_UPLOAD_PATH;
use crate::domain::{TypeConstraintError, UploadRoot};
use crate::services::validation::{MAX_FILE_SIZE, MAX_VIDEO_FILE_SIZE};

#[derive(Clone, Debug, Deserialize, Validate)]
/// Storage settings read once at startup.
pub struct StorageConfig {
    #[serde(default = "default_upload_path")]
    #[validate(length(min = 1))]
    pub upload_path: String,
    #[serde(default = "default_max_file_size")]
    #[validate(range(min = 1))]
    pub max_file_size: u64,
    #[serde(default = "default_max_video_file_size")]
    #[validate(range(min = 1))]
    pub max_video_file_size: u64,
}

impl StorageConfig {
    /// Absolute upload root, resolved against the working directory when relative.
    pub fn upload_root(&self) -> Result<UploadRoot, TypeConstraintError> {
        let configured = PathBuf::from(&self.upload_path);
        let absolute = path::absolute(&configured)
            .map_err(|_| TypeConstraintError::RelativeUploadRoot(configured))?;
        UploadRoot::try_new(absolute)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_path: default_upload_path(),
            max_file_size: default_max_file_size(),
            max_video_file_size: default_max_video_file_size(),
        }
    }
}

fn default_upload_path() -> String {
    DEFAULT_UPLOAD_PATH.to_string()
}

fn default_max_file_size() -> u64 {
    MAX_FILE_SIZE
}

fn default_max_video_file_size() -> u64 {
    MAX_VIDEO_FILE_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = StorageConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.upload_root().unwrap().as_path().is_absolute());
    }

    #[test]
    fn rejects_zero_limits_and_empty_path() {
        let config = StorageConfig {
            upload_path: String::new(),
            max_file_size: 0,
            ..StorageConfig::default()
        };
        let errors = config.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("upload_path"));
        assert!(fields.contains_key("max_file_size"));
        assert!(!fields.contains_key("max_video_file_size"));
    }

    #[test]
    fn deserializes_with_defaults() {
        let settings = ::config::Config::builder()
            .set_override("upload_path", "/srv/course-files")
            .unwrap()
            .build()
            .unwrap();
        let config: StorageConfig = settings.try_deserialize().unwrap();
        assert_eq!(config.upload_path, "/srv/course-files");
        assert_eq!(config.max_file_size, MAX_FILE_SIZE);
        assert_eq!(
            config.upload_root().unwrap().as_path(),
            std::path::Path::new("/srv/course-files")
        );
    }
}
