use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the sorter and the paginated reader.
///
/// Malformed source lines never show up here: they are absorbed where they
/// are decoded and only counted in the sort report.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Source file unavailable: {}: {source}", .path.display())]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Derivative file not found: {}", .path.display())]
    DerivativeMissing { path: PathBuf },

    #[error("Page {page_number} is beyond the available data")]
    PageOutOfRange { page_number: i64 },

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Coarse classification used by the request/response shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    ClientError,
    NotFound,
    Internal,
}

impl CatalogError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument { message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidArgument { .. } => ErrorClass::ClientError,
            Self::DerivativeMissing { .. } | Self::PageOutOfRange { .. } => ErrorClass::NotFound,
            _ => ErrorClass::Internal,
        }
    }

    pub fn status_code(&self) -> u16 {
        match self.class() {
            ErrorClass::ClientError => 400,
            ErrorClass::NotFound => 404,
            ErrorClass::Internal => 500,
        }
    }

    /// Message safe to hand to a client: no file system paths, no io details.
    pub fn public_message(&self) -> String {
        match self {
            Self::InvalidArgument { message } => message.clone(),
            Self::DerivativeMissing { .. } => "sorted catalog is not available".to_string(),
            Self::PageOutOfRange { page_number } => {
                format!("page {} is beyond the available data", page_number)
            }
            _ => "internal error".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
