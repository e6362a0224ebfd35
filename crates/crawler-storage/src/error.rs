use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("relational backend error: {0}")]
    Relational(#[from] sqlx::Error),
    #[error("file backend I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("file backend serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),
}
