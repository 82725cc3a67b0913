use thiserror::Error;

use crate::state_machine::Status;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("invalid tenant name: {0}")]
    InvalidName(String),

    #[error("invalid transition from {from:?} to {to:?}")]
    InvalidTransition { from: Status, to: Status },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
