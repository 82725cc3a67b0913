use std::sync::Arc;

use landlord_store::TenantStore;
use landlord_workflow::WorkflowManager;

/// Shared state for every handler. `workflow` is used only by `create_tenant`
/// and `update_tenant` to trigger the first/next workflow synchronously
/// — everything else routes straight through `store`.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TenantStore>,
    pub workflow: Arc<WorkflowManager>,
}
