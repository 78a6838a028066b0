//! Error types shared across the store, upload and HTTP layers

use thiserror::Error;

use crate::types::Collection;

/// Errors raised by the document store and the typed catalog on top of it
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("{collection}/{id} not found")]
    NotFound { collection: Collection, id: String },

    #[error("{collection}/{id} is referenced but does not exist")]
    DanglingReference { collection: Collection, id: String },

    #[error("{0}")]
    Validation(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised while validating or sending a PDF to the file host
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    #[error("Only PDF files are allowed")]
    InvalidType,

    #[error("File size must be less than {max_mb}MB")]
    TooLarge { max_mb: u64 },

    #[error("Please provide {0}")]
    MissingField(&'static str),

    #[error("{0}")]
    Rejected(String),

    #[error("Network error during upload")]
    Network,

    #[error("File uploads are not configured")]
    NotConfigured,
}

/// Errors surfaced by HTTP handlers
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Unauthorized: only admins can access this panel")]
    Unauthorized,

    #[error("{0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
