use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config_value::ConfigValue;
use crate::state_machine::Status;

/// Opaque 128-bit tenant identifier, assigned on create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantId(pub Uuid);

impl TenantId {
    pub fn new() -> Self {
        TenantId(Uuid::new_v4())
    }

    /// Short form used inside deterministic `ExecutionName`s
    /// (`"{action}-{tenantID}-{short-hash}"`).
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for TenantId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Last observed sub-state of a tenant's active workflow execution, projected
/// from provider-native states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowSubState {
    #[default]
    None,
    Running,
    Waiting,
    BackingOff,
    Retrying,
    Error,
    Failed,
    Succeeded,
}

impl WorkflowSubState {
    /// Degraded sub-states are the ones config drift is allowed to interrupt
    /// mid-execution. `Running` proper is never interrupted.
    pub fn is_degraded(self) -> bool {
        matches!(self, WorkflowSubState::BackingOff | WorkflowSubState::Retrying)
    }
}

impl std::fmt::Display for WorkflowSubState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WorkflowSubState::None => "",
            WorkflowSubState::Running => "running",
            WorkflowSubState::Waiting => "waiting",
            WorkflowSubState::BackingOff => "backing-off",
            WorkflowSubState::Retrying => "retrying",
            WorkflowSubState::Error => "error",
            WorkflowSubState::Failed => "failed",
            WorkflowSubState::Succeeded => "succeeded",
        };
        write!(f, "{s}")
    }
}

/// The unit of reconciliation: a named tenant, its desired and observed
/// configuration, and the state of its in-flight workflow execution, if any.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
    pub status: Status,
    pub status_message: Option<String>,

    pub desired_config: ConfigValue,
    pub compute_config: Option<ConfigValue>,
    pub observed_config: Option<ConfigValue>,
    pub observed_resource_ids: Option<HashMap<String, String>>,

    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub annotations: HashMap<String, String>,

    pub workflow_execution_id: Option<String>,
    #[serde(default)]
    pub workflow_sub_state: WorkflowSubState,
    #[serde(default)]
    pub workflow_retry_count: u32,
    pub workflow_error_message: Option<String>,
    pub workflow_config_hash: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

impl Tenant {
    /// Construct a new tenant ready for `TenantStore::create_tenant`.
    /// `id`, `created_at`, `updated_at`, and `version` are store-managed —
    /// callers pass placeholders that the store overwrites on success.
    pub fn new(name: impl Into<String>, desired_config: ConfigValue) -> Self {
        let now = Utc::now();
        Tenant {
            id: TenantId::new(),
            name: name.into(),
            status: Status::Requested,
            status_message: None,
            desired_config,
            compute_config: None,
            observed_config: None,
            observed_resource_ids: None,
            labels: HashMap::new(),
            annotations: HashMap::new(),
            workflow_execution_id: None,
            workflow_sub_state: WorkflowSubState::None,
            workflow_retry_count: 0,
            workflow_error_message: None,
            workflow_config_hash: None,
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }

    pub fn has_active_execution(&self) -> bool {
        self.workflow_execution_id.as_deref().is_some_and(|s| !s.is_empty())
    }
}

/// Append-only audit record of a status change. Never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub tenant_id: TenantId,
    pub from_status: Status,
    pub to_status: Status,
    pub reason: String,
    pub at: DateTime<Utc>,
    pub error_detail: Option<String>,
}

impl StateTransition {
    pub fn new(
        tenant_id: TenantId,
        from_status: Status,
        to_status: Status,
        reason: impl Into<String>,
    ) -> Self {
        StateTransition {
            tenant_id,
            from_status,
            to_status,
            reason: reason.into(),
            at: Utc::now(),
            error_detail: None,
        }
    }

    pub fn with_error(mut self, error_detail: impl Into<String>) -> Self {
        self.error_detail = Some(error_detail.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_tenant_starts_requested_version_one() {
        let t = Tenant::new("acme", ConfigValue(json!({"image": "nginx"})));
        assert_eq!(t.status, Status::Requested);
        assert_eq!(t.version, 1);
        assert!(!t.has_active_execution());
    }

    #[test]
    fn active_execution_requires_non_empty_id() {
        let mut t = Tenant::new("acme", ConfigValue::null());
        assert!(!t.has_active_execution());
        t.workflow_execution_id = Some(String::new());
        assert!(!t.has_active_execution());
        t.workflow_execution_id = Some("exec-1".into());
        assert!(t.has_active_execution());
    }
}
