pub mod config_value;
pub mod error;
pub mod hash;
pub mod state_machine;
pub mod tenant;

pub use config_value::ConfigValue;
pub use error::DomainError;
pub use hash::{compute_config_hash, compute_desired_hash};
pub use state_machine::{next_status, validate_transition, Status};
pub use tenant::{StateTransition, Tenant, TenantId, WorkflowSubState};
