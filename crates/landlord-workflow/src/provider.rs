use async_trait::async_trait;

use crate::error::WorkflowError;
use crate::execution::{ExecutionHandle, ExecutionInput, ExecutionStatus};
use crate::spec::WorkflowSpec;

/// Capability set a workflow provider must implement.
/// Providers are discovered by name at startup; the controller depends
/// only on this trait, never on a specific provider's concrete type.
#[async_trait]
pub trait WorkflowProvider: Send + Sync + 'static {
    fn name(&self) -> &str;

    /// Idempotent on `workflow_id`: creating the same workflow twice
    /// succeeds without duplicating it.
    async fn create_workflow(&self, spec: &WorkflowSpec) -> Result<(), WorkflowError>;

    /// Strong idempotency requirement: two calls with the same
    /// `execution_name` return the same execution, including when raced
    /// concurrently.
    async fn start_execution(
        &self,
        workflow_id: &str,
        input: &ExecutionInput,
    ) -> Result<ExecutionHandle, WorkflowError>;

    async fn get_execution_status(&self, execution_id: &str) -> Result<ExecutionStatus, WorkflowError>;

    /// Idempotent: stopping an already-terminal execution succeeds.
    async fn stop_execution(&self, execution_id: &str, reason: &str) -> Result<(), WorkflowError>;

    /// Idempotent: deleting a non-existent workflow succeeds.
    async fn delete_workflow(&self, workflow_id: &str) -> Result<(), WorkflowError>;
}
