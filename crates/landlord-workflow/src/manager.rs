use std::sync::Arc;

use tracing::warn;

use crate::error::WorkflowError;
use crate::execution::{ExecutionHandle, ExecutionInput, ExecutionStatus};
use crate::provider::WorkflowProvider;
use crate::registry::WorkflowRegistry;
use crate::spec::{validate_spec, validate_workflow_id, WorkflowSpec};

/// Thin facade over a single configured [`WorkflowProvider`]: validates
/// structure before every call that names a workflow, routes to the
/// provider, and never changes the provider-surfaced error identity for the
/// canonical `NotFound`/`InvalidSpec` categories.
pub struct WorkflowManager {
    registry: Arc<WorkflowRegistry>,
    provider_name: String,
}

impl WorkflowManager {
    pub fn new(registry: Arc<WorkflowRegistry>, provider_name: impl Into<String>) -> Self {
        Self {
            registry,
            provider_name: provider_name.into(),
        }
    }

    fn provider(&self) -> Result<Arc<dyn WorkflowProvider>, WorkflowError> {
        self.registry.get(&self.provider_name)
    }

    /// Idempotent on `workflow_id`.
    pub async fn create_workflow(&self, spec: &WorkflowSpec) -> Result<(), WorkflowError> {
        validate_spec(spec)?;
        self.provider()?.create_workflow(spec).await.map_err(|e| {
            warn!(workflow_id = %spec.workflow_id, error = %e, "create_workflow failed");
            e
        })
    }

    pub async fn start_execution(
        &self,
        workflow_id: &str,
        input: &ExecutionInput,
    ) -> Result<ExecutionHandle, WorkflowError> {
        validate_workflow_id(workflow_id)?;
        self.provider()?.start_execution(workflow_id, input).await.map_err(|e| {
            warn!(workflow_id, execution_name = %input.execution_name, error = %e, "start_execution failed");
            e
        })
    }

    pub async fn get_execution_status(&self, execution_id: &str) -> Result<ExecutionStatus, WorkflowError> {
        self.provider()?.get_execution_status(execution_id).await
    }

    pub async fn stop_execution(&self, execution_id: &str, reason: &str) -> Result<(), WorkflowError> {
        self.provider()?.stop_execution(execution_id, reason).await
    }

    pub async fn delete_workflow(&self, workflow_id: &str) -> Result<(), WorkflowError> {
        self.provider()?.delete_workflow(workflow_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryWorkflowProvider;
    use landlord_compute::MockComputeProvider;
    use std::time::Duration;

    fn manager() -> WorkflowManager {
        let mut registry = WorkflowRegistry::new();
        let compute = Arc::new(MockComputeProvider::new("mock"));
        registry
            .register(Arc::new(InMemoryWorkflowProvider::new("ref", compute)))
            .unwrap();
        WorkflowManager::new(Arc::new(registry), "ref")
    }

    fn spec() -> WorkflowSpec {
        WorkflowSpec {
            workflow_id: "provision".into(),
            name: "Provision tenant".into(),
            definition: b"noop".to_vec(),
            timeout: Some(Duration::from_secs(30)),
        }
    }

    #[tokio::test]
    async fn rejects_invalid_spec_before_routing() {
        let mgr = manager();
        let mut bad = spec();
        bad.workflow_id = "Bad Id!".into();
        let err = mgr.create_workflow(&bad).await.unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidSpec(_)));
    }

    #[tokio::test]
    async fn routes_valid_spec_to_provider() {
        let mgr = manager();
        mgr.create_workflow(&spec()).await.unwrap();
    }

    #[tokio::test]
    async fn unknown_provider_surfaces_provider_not_found() {
        let registry = Arc::new(WorkflowRegistry::new());
        let mgr = WorkflowManager::new(registry, "missing");
        let err = mgr.create_workflow(&spec()).await.unwrap_err();
        assert!(matches!(err, WorkflowError::ProviderNotFound(_)));
    }
}
