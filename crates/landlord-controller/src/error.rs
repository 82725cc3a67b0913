use thiserror::Error;

use landlord_store::StoreError;
use landlord_workflow::WorkflowError;

/// Failures that can occur starting or running the controller — distinct
/// from the per-tenant classification `reconcile` performs internally,
/// which never surfaces errors outward.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("workflow error: {0}")]
    Workflow(#[from] WorkflowError),
}
