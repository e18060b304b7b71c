//! Application services orchestrating domain logic and side effects.
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};

use crate::domain::FileCategory;

pub mod files;
pub mod guard;
pub mod naming;
pub mod store;
pub mod translator;
pub mod validation;

/// Convenience alias for service results.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors surfaced by service operations.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("filename cannot be missing")]
    MissingFilename,
    #[error("unsupported file type '{extension}', allowed file types: {allowed}")]
    UnsupportedFileType { extension: String, allowed: String },
    #[error("the file is too large, maximum file size is {} MB", .limit / (1024 * 1024))]
    PayloadTooLarge { size: u64, limit: u64 },
    #[error("invalid {segment} segment in {category} path: {reason}")]
    FilePathParsing {
        category: FileCategory,
        segment: String,
        reason: String,
    },
    #[error("{category} paths embed {expected} entity ids, got {actual}")]
    InvalidIdCount {
        category: FileCategory,
        expected: usize,
        actual: usize,
    },
    #[error("path rejected: {0}")]
    Security(String),
    #[error("failed to create directories")]
    CreateDirectories(#[source] std::io::Error),
    #[error("failed to save file")]
    SaveFile(#[source] std::io::Error),
    #[error("failed to copy file")]
    CopyFile(#[source] std::io::Error),
}

impl ServiceError {
    pub(crate) fn path_parsing(
        category: FileCategory,
        segment: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        ServiceError::FilePathParsing {
            category,
            segment: segment.into(),
            reason: reason.into(),
        }
    }

    /// Whether the caller can fix the request (4xx) as opposed to a server fault.
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Message safe to show to clients. Server-side faults never expose paths.
    pub fn client_message(&self) -> String {
        if self.is_client_error() {
            self.to_string()
        } else {
            "internal error while handling the file".to_string()
        }
    }
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::MissingFilename
            | ServiceError::UnsupportedFileType { .. }
            | ServiceError::FilePathParsing { .. } => StatusCode::BAD_REQUEST,
            ServiceError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ServiceError::InvalidIdCount { .. }
            | ServiceError::Security(_)
            | ServiceError::CreateDirectories(_)
            | ServiceError::SaveFile(_)
            | ServiceError::CopyFile(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).body(self.client_message())
    }
}
