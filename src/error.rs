use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Insufficient funds for user {user_id}: available {available}, requested {requested}")]
    InsufficientFunds {
        user_id: u64,
        available: rust_decimal::Decimal,
        requested: rust_decimal::Decimal,
    },

    /// Transient storage failure. Callers may retry the whole run; every
    /// mutating step is idempotency-keyed so retries are safe.
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidStatusTransition { from: String, to: String },

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for EngineError {
    fn from(e: rocksdb::Error) -> Self {
        EngineError::StorageError(e.to_string())
    }
}

impl EngineError {
    /// Transient errors are worth a bounded retry; everything else is not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::StorageError(_))
    }
}
