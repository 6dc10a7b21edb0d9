use crate::domain::error::DomainError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Version conflict: {0}")]
    Conflict(String),
    #[error("Credential error: {0}")]
    Credential(String),
    #[error("Password hashing error: {0}")]
    Password(String),
    #[error("Upload rejected: {0}")]
    Upload(String),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("API error {status}: {message}")]
    Api { status: u16, code: String, message: String },
}
