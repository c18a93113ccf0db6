use thiserror::Error;

/// Failures surfaced by every storage backend.
///
/// Medium errors keep the original message; signal validation errors are
/// raised before anything is written.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("error thrown when opening storage: {0}")]
    Open(String),
    #[error("error thrown when reading from storage: {0}")]
    Read(String),
    #[error("error thrown when writing to storage: {0}")]
    Write(String),
    #[error("error thrown when deleting from storage: {0}")]
    Delete(String),
    #[error("setting more than {max} custom signals is not supported (got {count})")]
    CustomSignalLimitExceeded { max: usize, count: usize },
    #[error("custom signal key {key:?} is longer than {max} characters")]
    CustomSignalKeyLength { key: String, max: usize },
    #[error("value of custom signal {key:?} is longer than {max} characters")]
    CustomSignalValueLength { key: String, max: usize },
}

impl StorageError {
    /// Stable code for external mapping/logging
    pub fn code(&self) -> &'static str {
        match self {
            StorageError::Open(_) => "storage-open",
            StorageError::Read(_) => "storage-get",
            StorageError::Write(_) => "storage-set",
            StorageError::Delete(_) => "storage-delete",
            StorageError::CustomSignalLimitExceeded { .. } => "custom-signal-max-allowed-signals",
            StorageError::CustomSignalKeyLength { .. } => "custom-signal-key-length",
            StorageError::CustomSignalValueLength { .. } => "custom-signal-value-length",
        }
    }

    /// Whether the error came from the underlying medium rather than input validation.
    pub fn is_medium_error(&self) -> bool {
        matches!(self, StorageError::Open(_) | StorageError::Read(_) | StorageError::Write(_) | StorageError::Delete(_))
    }
}
