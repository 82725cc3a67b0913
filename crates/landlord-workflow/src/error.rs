use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("workflow not found: {0}")]
    WorkflowNotFound(String),

    #[error("execution not found: {0}")]
    ExecutionNotFound(String),

    #[error("invalid workflow spec: {0}")]
    InvalidSpec(String),

    #[error("provider conflict: {0} already registered")]
    ProviderConflict(String),

    #[error("provider not found: {0}")]
    ProviderNotFound(String),

    #[error("transient workflow error: {0}")]
    Transient(String),
}

impl WorkflowError {
    /// `InvalidSpec` is the only non-retryable identity the manager
    /// surfaces; everything else defaults to retryable.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, WorkflowError::InvalidSpec(_))
    }
}
