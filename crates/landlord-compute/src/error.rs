use thiserror::Error;

#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("tenant not found: {0}")]
    TenantNotFound(String),

    #[error("invalid compute spec: {0}")]
    InvalidSpec(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("provision failed: {0}")]
    ProvisionFailed(String),

    #[error("provider conflict: {0} already registered")]
    ProviderConflict(String),

    #[error("provider not found: {0}")]
    ProviderNotFound(String),

    #[error("transient compute error: {0}")]
    Transient(String),
}

impl ComputeError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ComputeError::Transient(_))
    }
}
