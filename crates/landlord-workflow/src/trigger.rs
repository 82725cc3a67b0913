use std::collections::HashMap;

use landlord_domain::hash::compute_desired_hash;
use landlord_domain::tenant::Tenant;

use crate::execution::ExecutionInput;
use crate::spec::{TriggerSource, WorkflowAction};

/// Builds the deterministic `ExecutionName` (`"{action}-{tenantID}-{short-hash}"`)
/// and the full [`ExecutionInput`] for triggering `action` against `tenant`.
/// Shared by the controller's reconcile step and any API handler that
/// triggers a workflow directly, so two independent triggers for the same
/// desired state converge on the same execution instead of starting
/// duplicates.
///
/// Returns the input alongside the full `ConfigHash` — callers persist the
/// hash onto `WorkflowConfigHash` after a successful `start_execution`.
pub fn build_trigger(tenant: &Tenant, action: WorkflowAction, trigger_source: TriggerSource) -> (ExecutionInput, String) {
    let config_hash = compute_desired_hash(&tenant.desired_config, tenant.compute_config.as_ref());
    let short_hash = &config_hash[..config_hash.len().min(8)];
    let execution_name = format!("{action}-{}-{short_hash}", tenant.id);

    let mut tags = HashMap::new();
    tags.insert("tenant_id".to_string(), tenant.id.to_string());

    let input = ExecutionInput {
        execution_name,
        tenant_id: tenant.id.to_string(),
        action,
        desired_config: tenant.desired_config.clone(),
        compute_config: tenant.compute_config.clone(),
        trigger_source,
        tags,
    };

    (input, config_hash)
}
