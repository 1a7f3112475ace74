//! Error types for the folder catalog
//!
//! Every repository operation returns [`Result`]; the UI layer decides how
//! each [`ErrorKind`] is shown to the user.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for catalog operations
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Coarse classification of a [`CatalogError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Storage,
    Deserialization,
    Validation,
    Store,
}

/// Errors produced by the folder repository and its collaborators
#[derive(Error, Debug)]
pub enum CatalogError {
    /// No folder with the given id exists
    #[error("Folder not found: '{0}'")]
    FolderNotFound(String),

    /// A file-system operation on image assets failed
    #[error("Storage error while {action} '{}': {source}", .path.display())]
    Storage {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An embedded data: URI could not be decoded into image bytes
    #[error("Invalid embedded image data: {0}")]
    InvalidImageData(String),

    /// The persisted folder collection is not valid JSON
    #[error("Folder collection is unreadable: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// A required field was empty
    #[error("Missing required field: {0}")]
    Validation(&'static str),

    /// The SQLite key-value backend failed
    #[error("Key-value store error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The key-value backend is unusable for another reason
    #[error("Key-value store error: {0}")]
    Store(String),
}

impl CatalogError {
    /// Build a storage error for a failed file-system call
    pub fn storage(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CatalogError::Storage {
            action,
            path: path.into(),
            source,
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::FolderNotFound(_) => ErrorKind::NotFound,
            CatalogError::Storage { .. } | CatalogError::InvalidImageData(_) => ErrorKind::Storage,
            CatalogError::Deserialization(_) => ErrorKind::Deserialization,
            CatalogError::Validation(_) => ErrorKind::Validation,
            CatalogError::Sqlite(_) | CatalogError::Store(_) => ErrorKind::Store,
        }
    }
}

impl From<tokio::task::JoinError> for CatalogError {
    fn from(err: tokio::task::JoinError) -> Self {
        CatalogError::Store(format!("Task join error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        let err = CatalogError::FolderNotFound("42".to_string());
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = CatalogError::storage(
            "copying",
            "/tmp/missing.jpg",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert!(err.to_string().contains("/tmp/missing.jpg"));

        let err = CatalogError::InvalidImageData("no payload".to_string());
        assert_eq!(err.kind(), ErrorKind::Storage);
    }
}
