pub mod error;
pub mod execution;
pub mod manager;
pub mod memory;
pub mod provider;
pub mod registry;
pub mod spec;
pub mod trigger;

pub use error::WorkflowError;
pub use execution::{ExecutionHandle, ExecutionInput, ExecutionState, ExecutionStatus};
pub use manager::WorkflowManager;
pub use memory::{InMemoryWorkflowProvider, ScriptedOutcome, ScriptedStart};
pub use provider::WorkflowProvider;
pub use registry::WorkflowRegistry;
pub use spec::{validate_spec, validate_workflow_id, TriggerSource, WorkflowAction, WorkflowSpec};
pub use trigger::build_trigger;
