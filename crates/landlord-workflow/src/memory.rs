use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use landlord_compute::{ComputeProvider, ComputeSpec};
use landlord_domain::WorkflowSubState;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::error::WorkflowError;
use crate::execution::{ExecutionHandle, ExecutionInput, ExecutionState, ExecutionStatus};
use crate::provider::WorkflowProvider;
use crate::spec::{WorkflowAction, WorkflowSpec};

/// A scripted outcome for the *next* `start_execution` call against a given
/// `execution_name` that doesn't already have an execution. Used by tests
/// to simulate transient start failures and terminal outcomes without a
/// real workflow engine.
#[derive(Debug, Clone)]
pub enum ScriptedStart {
    Fail(String),
    Outcome(ScriptedOutcome),
}

#[derive(Debug, Clone)]
pub enum ScriptedOutcome {
    /// Stays non-terminal until a test advances it with [`InMemoryWorkflowProvider::set_status`].
    Running,
    Succeeded,
    Failed(String),
    TimedOut,
    Cancelled,
}

struct ExecutionRecord {
    workflow_id: String,
    state: ExecutionState,
    sub_state: WorkflowSubState,
    retry_count: u32,
    error_message: Option<String>,
}

#[derive(Default)]
struct Inner {
    workflows: HashSet<String>,
    executions: HashMap<String, ExecutionRecord>,
    by_name: HashMap<String, String>,
    scripts: HashMap<String, VecDeque<ScriptedStart>>,
}

/// Reference `WorkflowProvider` used by the controller's own test suite.
///
/// Internally calls a configured [`ComputeProvider`] on terminal success to
/// give execution outcomes real compute side effects.
pub struct InMemoryWorkflowProvider {
    name: String,
    compute: Arc<dyn ComputeProvider>,
    inner: Mutex<Inner>,
}

impl InMemoryWorkflowProvider {
    pub fn new(name: impl Into<String>, compute: Arc<dyn ComputeProvider>) -> Self {
        Self {
            name: name.into(),
            compute,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Queue a scripted response for the next `start_execution` call that
    /// would otherwise create a *new* execution under `execution_name`.
    /// Has no effect on a call that hits the idempotency cache.
    pub async fn script(&self, execution_name: impl Into<String>, outcome: ScriptedStart) {
        let mut inner = self.inner.lock().await;
        inner
            .scripts
            .entry(execution_name.into())
            .or_default()
            .push_back(outcome);
    }

    /// Force an existing execution's observed state, simulating an external
    /// engine's progress (e.g. backing-off, then terminal failure).
    pub async fn set_status(
        &self,
        execution_id: &str,
        state: ExecutionState,
        sub_state: WorkflowSubState,
        error_message: Option<String>,
    ) {
        let mut inner = self.inner.lock().await;
        if let Some(record) = inner.executions.get_mut(execution_id) {
            record.state = state;
            record.sub_state = sub_state;
            record.error_message = error_message;
        }
    }

    pub async fn bump_retry_count(&self, execution_id: &str) {
        let mut inner = self.inner.lock().await;
        if let Some(record) = inner.executions.get_mut(execution_id) {
            record.retry_count += 1;
        }
    }
}

#[async_trait]
impl WorkflowProvider for InMemoryWorkflowProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn create_workflow(&self, spec: &WorkflowSpec) -> Result<(), WorkflowError> {
        debug!(workflow_id = %spec.workflow_id, "in-memory: create_workflow");
        let mut inner = self.inner.lock().await;
        inner.workflows.insert(spec.workflow_id.clone());
        Ok(())
    }

    async fn start_execution(
        &self,
        workflow_id: &str,
        input: &ExecutionInput,
    ) -> Result<ExecutionHandle, WorkflowError> {
        let mut inner = self.inner.lock().await;
        if !inner.workflows.contains(workflow_id) {
            return Err(WorkflowError::WorkflowNotFound(workflow_id.to_string()));
        }
        if let Some(existing_id) = inner.by_name.get(&input.execution_name) {
            debug!(execution_name = %input.execution_name, execution_id = %existing_id, "in-memory: start_execution idempotent hit");
            return Ok(ExecutionHandle { execution_id: existing_id.clone() });
        }

        let scripted = inner
            .scripts
            .get_mut(&input.execution_name)
            .and_then(VecDeque::pop_front);
        match scripted {
            Some(ScriptedStart::Fail(msg)) => {
                return Err(WorkflowError::Transient(msg));
            }
            Some(ScriptedStart::Outcome(outcome)) => {
                let execution_id = self.materialize(&mut inner, workflow_id, input, outcome).await?;
                Ok(ExecutionHandle { execution_id })
            }
            None => {
                let execution_id = self
                    .materialize(&mut inner, workflow_id, input, ScriptedOutcome::Succeeded)
                    .await?;
                Ok(ExecutionHandle { execution_id })
            }
        }
    }

    async fn get_execution_status(&self, execution_id: &str) -> Result<ExecutionStatus, WorkflowError> {
        let inner = self.inner.lock().await;
        let record = inner
            .executions
            .get(execution_id)
            .ok_or_else(|| WorkflowError::ExecutionNotFound(execution_id.to_string()))?;
        Ok(ExecutionStatus {
            execution_id: execution_id.to_string(),
            state: record.state,
            sub_state: record.sub_state,
            retry_count: record.retry_count,
            error_message: record.error_message.clone(),
        })
    }

    async fn stop_execution(&self, execution_id: &str, reason: &str) -> Result<(), WorkflowError> {
        let mut inner = self.inner.lock().await;
        if let Some(record) = inner.executions.get_mut(execution_id) {
            if !record.state.is_terminal() {
                record.state = ExecutionState::Cancelled;
                record.sub_state = WorkflowSubState::Failed;
                record.error_message = Some(reason.to_string());
            }
        }
        Ok(())
    }

    async fn delete_workflow(&self, workflow_id: &str) -> Result<(), WorkflowError> {
        let mut inner = self.inner.lock().await;
        inner.workflows.remove(workflow_id);
        Ok(())
    }
}

impl InMemoryWorkflowProvider {
    /// Create a new execution record for `input`, calling into the compute
    /// provider when the scripted outcome is a genuine success. Called with
    /// `inner` already locked; holds the lock for the compute call too,
    /// serializing `start_execution` calls workspace-wide — an acceptable
    /// simplification for a reference/test provider, not a production one.
    async fn materialize(
        &self,
        inner: &mut tokio::sync::MutexGuard<'_, Inner>,
        workflow_id: &str,
        input: &ExecutionInput,
        outcome: ScriptedOutcome,
    ) -> Result<String, WorkflowError> {
        let execution_id = Uuid::new_v4().to_string();

        let (state, sub_state, error_message) = match outcome {
            ScriptedOutcome::Running => (ExecutionState::Running, WorkflowSubState::Running, None),
            ScriptedOutcome::Failed(msg) => (ExecutionState::Failed, WorkflowSubState::Error, Some(msg)),
            ScriptedOutcome::TimedOut => (ExecutionState::TimedOut, WorkflowSubState::Error, None),
            ScriptedOutcome::Cancelled => (ExecutionState::Cancelled, WorkflowSubState::Failed, None),
            ScriptedOutcome::Succeeded => {
                self.run_compute(input).await?;
                (ExecutionState::Succeeded, WorkflowSubState::Succeeded, None)
            }
        };

        inner.executions.insert(
            execution_id.clone(),
            ExecutionRecord {
                workflow_id: workflow_id.to_string(),
                state,
                sub_state,
                retry_count: 0,
                error_message,
            },
        );
        inner.by_name.insert(input.execution_name.clone(), execution_id.clone());
        Ok(execution_id)
    }

    async fn run_compute(&self, input: &ExecutionInput) -> Result<(), WorkflowError> {
        let image = input
            .desired_config
            .as_value()
            .get("image")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string();
        let spec = ComputeSpec {
            tenant_id: input.tenant_id.clone(),
            image,
            config: input.compute_config.clone().unwrap_or_default(),
        };
        let result = match input.action {
            WorkflowAction::Provision => self.compute.provision(&spec).await,
            WorkflowAction::Update => self.compute.update(&input.tenant_id, &spec).await,
            WorkflowAction::Delete | WorkflowAction::Archive => {
                self.compute.destroy(&input.tenant_id).await.map(|_| landlord_compute::ProvisionResult {
                    observed_config: spec.config.clone(),
                    resource_ids: Default::default(),
                })
            }
        };
        result.map(|_| ()).map_err(|e| WorkflowError::Transient(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use landlord_compute::MockComputeProvider;
    use landlord_domain::ConfigValue;
    use serde_json::json;
    use std::collections::HashMap as Map;

    fn provider() -> InMemoryWorkflowProvider {
        InMemoryWorkflowProvider::new("ref", Arc::new(MockComputeProvider::new("mock")))
    }

    fn input(execution_name: &str, tenant_id: &str) -> ExecutionInput {
        ExecutionInput {
            execution_name: execution_name.to_string(),
            tenant_id: tenant_id.to_string(),
            action: WorkflowAction::Provision,
            desired_config: ConfigValue(json!({"image": "nginx:1.25"})),
            compute_config: None,
            trigger_source: crate::spec::TriggerSource::Controller,
            tags: Map::new(),
        }
    }

    #[tokio::test]
    async fn start_execution_is_idempotent_on_name() {
        let p = provider();
        let spec = WorkflowSpec {
            workflow_id: "provision".into(),
            name: "Provision".into(),
            definition: b"noop".to_vec(),
            timeout: None,
        };
        p.create_workflow(&spec).await.unwrap();

        let i = input("provision-t1-abcd1234", "t1");
        let h1 = p.start_execution("provision", &i).await.unwrap();
        let h2 = p.start_execution("provision", &i).await.unwrap();
        assert_eq!(h1.execution_id, h2.execution_id);
    }

    #[tokio::test]
    async fn default_outcome_succeeds_and_calls_compute() {
        let p = provider();
        let spec = WorkflowSpec {
            workflow_id: "provision".into(),
            name: "Provision".into(),
            definition: b"noop".to_vec(),
            timeout: None,
        };
        p.create_workflow(&spec).await.unwrap();
        let i = input("provision-t1-abcd1234", "t1");
        let handle = p.start_execution("provision", &i).await.unwrap();
        let status = p.get_execution_status(&handle.execution_id).await.unwrap();
        assert_eq!(status.state, ExecutionState::Succeeded);
    }

    #[tokio::test]
    async fn scripted_transient_failure_then_success() {
        let p = provider();
        let spec = WorkflowSpec {
            workflow_id: "provision".into(),
            name: "Provision".into(),
            definition: b"noop".to_vec(),
            timeout: None,
        };
        p.create_workflow(&spec).await.unwrap();
        let name = "provision-t1-abcd1234";
        p.script(name, ScriptedStart::Fail("connection reset".into())).await;
        p.script(name, ScriptedStart::Fail("connection reset".into())).await;

        let i = input(name, "t1");
        assert!(p.start_execution("provision", &i).await.is_err());
        assert!(p.start_execution("provision", &i).await.is_err());
        let handle = p.start_execution("provision", &i).await.unwrap();
        let status = p.get_execution_status(&handle.execution_id).await.unwrap();
        assert_eq!(status.state, ExecutionState::Succeeded);
    }

    #[tokio::test]
    async fn unknown_execution_id_not_found() {
        let p = provider();
        assert!(matches!(
            p.get_execution_status("ghost").await,
            Err(WorkflowError::ExecutionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn stop_execution_is_idempotent() {
        let p = provider();
        p.stop_execution("never-started", "reason").await.unwrap();
    }

    #[tokio::test]
    async fn running_execution_can_be_advanced_to_terminal() {
        let p = provider();
        let spec = WorkflowSpec {
            workflow_id: "provision".into(),
            name: "Provision".into(),
            definition: b"noop".to_vec(),
            timeout: None,
        };
        p.create_workflow(&spec).await.unwrap();
        let name = "provision-t2-deadbeef";
        p.script(name, ScriptedStart::Outcome(ScriptedOutcome::Running)).await;
        let i = input(name, "t2");
        let handle = p.start_execution("provision", &i).await.unwrap();
        let status = p.get_execution_status(&handle.execution_id).await.unwrap();
        assert_eq!(status.sub_state, WorkflowSubState::Running);

        p.set_status(&handle.execution_id, ExecutionState::Failed, WorkflowSubState::Error, Some("boom".into()))
            .await;
        let status = p.get_execution_status(&handle.execution_id).await.unwrap();
        assert_eq!(status.state, ExecutionState::Failed);
        assert_eq!(status.error_message.as_deref(), Some("boom"));
    }
}
