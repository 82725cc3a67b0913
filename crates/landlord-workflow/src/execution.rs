use std::collections::HashMap;

use landlord_domain::{ConfigValue, WorkflowSubState};
use serde::{Deserialize, Serialize};

use crate::spec::TriggerSource;

/// Input to `WorkflowProvider::start_execution`. `execution_name` is the
/// idempotency key: calling `start_execution` twice with the same name
/// returns the existing execution rather than starting a second one.
#[derive(Debug, Clone)]
pub struct ExecutionInput {
    pub execution_name: String,
    pub tenant_id: String,
    pub action: crate::spec::WorkflowAction,
    pub desired_config: ConfigValue,
    pub compute_config: Option<ConfigValue>,
    pub trigger_source: TriggerSource,
    pub tags: HashMap<String, String>,
}

/// Canonical execution state, independent of any provider's native vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionState {
    Pending,
    Running,
    Succeeded,
    Failed,
    TimedOut,
    Cancelled,
}

impl ExecutionState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExecutionState::Succeeded
                | ExecutionState::Failed
                | ExecutionState::TimedOut
                | ExecutionState::Cancelled
        )
    }

    /// The canonical sub-state projection used when no finer-grained
    /// provider-native state is available. Unknown states fall back to
    /// `Running` to avoid premature terminal classification.
    pub fn default_sub_state(self) -> WorkflowSubState {
        match self {
            ExecutionState::Pending => WorkflowSubState::Waiting,
            ExecutionState::Running => WorkflowSubState::Running,
            ExecutionState::Succeeded => WorkflowSubState::Succeeded,
            ExecutionState::Failed => WorkflowSubState::Error,
            ExecutionState::TimedOut => WorkflowSubState::Error,
            ExecutionState::Cancelled => WorkflowSubState::Failed,
        }
    }
}

/// Result of `create_workflow`/`start_execution`.
#[derive(Debug, Clone)]
pub struct ExecutionHandle {
    pub execution_id: String,
}

/// Snapshot returned by `get_execution_status`.
#[derive(Debug, Clone)]
pub struct ExecutionStatus {
    pub execution_id: String,
    pub state: ExecutionState,
    pub sub_state: WorkflowSubState,
    pub retry_count: u32,
    pub error_message: Option<String>,
}
