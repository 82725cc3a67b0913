use thiserror::Error;

/// Canonical failure identities a `TenantStore` implementation must map its
/// backend's errors onto.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("tenant not found: {0}")]
    NotFound(String),

    #[error("tenant name already exists: {0}")]
    AlreadyExists(String),

    #[error("version conflict: expected version {expected}, tenant is at {actual}")]
    VersionConflict { expected: u64, actual: u64 },

    #[error("invalid tenant: {0}")]
    Invalid(String),

    #[error("transient store error: {0}")]
    Transient(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("operation cancelled")]
    Cancelled,
}

impl StoreError {
    /// `Transient` and `Serialization` are the only retryable identities;
    /// `NotFound`/`AlreadyExists`/`VersionConflict`/`Invalid`/`Cancelled` are
    /// all handled by their own dedicated branch in the reconcile step
    /// rather than falling through to a generic retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Transient(_) | StoreError::Serialization(_))
    }
}
