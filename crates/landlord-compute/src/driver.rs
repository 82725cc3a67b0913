use async_trait::async_trait;
use landlord_domain::ConfigValue;
use serde::{Deserialize, Serialize};

use crate::error::ComputeError;

/// Provider-specific compute configuration handed to `Provision`/`Update`.
/// Shares the schemaless shape of `landlord_domain::ConfigValue` — a compute
/// provider validates it against its own schema, it never dictates the shape
/// back to the tenant model.
#[derive(Debug, Clone)]
pub struct ComputeSpec {
    pub tenant_id: String,
    pub image: String,
    pub config: ConfigValue,
}

/// Result of a successful `Provision`/`Update` call.
#[derive(Debug, Clone)]
pub struct ProvisionResult {
    /// Configuration observed back from the provider (e.g. resolved defaults).
    pub observed_config: ConfigValue,
    /// Provider-native resource identifiers (e.g. container ID, task ARN).
    pub resource_ids: std::collections::HashMap<String, String>,
}

/// Point-in-time status of a tenant's compute resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComputeStatus {
    Pending,
    Running,
    Degraded,
    Stopped,
}

/// Capability set a compute provider must implement. Providers are leaf
/// dependencies with no knowledge of tenants as a concept — they are invoked
/// by workflow executions, never directly by the controller.
#[async_trait]
pub trait ComputeProvider: Send + Sync + 'static {
    /// Unique, lowercase, alphanumeric+hyphens provider name.
    fn name(&self) -> &str;

    async fn provision(&self, spec: &ComputeSpec) -> Result<ProvisionResult, ComputeError>;

    /// Idempotent: re-applying the same spec is a no-op.
    async fn update(&self, tenant_id: &str, spec: &ComputeSpec) -> Result<ProvisionResult, ComputeError>;

    /// Idempotent: tearing down a non-existent tenant succeeds.
    async fn destroy(&self, tenant_id: &str) -> Result<(), ComputeError>;

    async fn get_status(&self, tenant_id: &str) -> Result<ComputeStatus, ComputeError>;

    /// Structural validation with no side effects.
    async fn validate(&self, spec: &ComputeSpec) -> Result<(), ComputeError>;

    /// Schema check performed by the API before `ComputeConfig` is persisted.
    fn validate_config(&self, raw: &ConfigValue) -> Result<(), ComputeError>;

    /// Machine-readable JSON Schema for this provider's configuration.
    fn config_schema(&self) -> ConfigValue;

    /// Default values for fields `validate_config` considers optional.
    fn config_defaults(&self) -> ConfigValue;
}
