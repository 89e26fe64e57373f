use thiserror::Error;

/// Classified failure of the key/value persistence layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("storage quota exceeded")]
    QuotaExceeded,
    #[error("storage access denied")]
    AccessDenied,
    #[error("storage error: {0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    Invalid(&'static str),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("serialize: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl CoreError {
    /// The storage failure behind this error, if any.
    pub fn storage_kind(&self) -> Option<&StorageError> {
        match self {
            CoreError::Storage(e) => Some(e),
            _ => None,
        }
    }
}
