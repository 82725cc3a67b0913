use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use landlord_domain::ConfigValue;
use serde_json::json;
use tracing::debug;

use crate::driver::{ComputeProvider, ComputeSpec, ComputeStatus, ProvisionResult};
use crate::error::ComputeError;

/// A stub compute provider that simulates provisioning locally.
///
/// Produces synthetic resource identifiers, tracks per-tenant status in
/// memory, and performs no actual I/O. Good enough to back the controller's
/// own test suite and the in-memory workflow provider's `Provision` calls.
#[derive(Debug, Default)]
pub struct MockComputeProvider {
    name: String,
    tenants: Mutex<HashMap<String, ComputeStatus>>,
}

impl MockComputeProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tenants: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl ComputeProvider for MockComputeProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn provision(&self, spec: &ComputeSpec) -> Result<ProvisionResult, ComputeError> {
        debug!(tenant_id = %spec.tenant_id, image = %spec.image, "mock: provision");
        self.tenants
            .lock()
            .unwrap()
            .insert(spec.tenant_id.clone(), ComputeStatus::Running);
        let mut resource_ids = HashMap::new();
        resource_ids.insert("container_id".to_string(), format!("mock://{}", spec.tenant_id));
        Ok(ProvisionResult {
            observed_config: spec.config.clone(),
            resource_ids,
        })
    }

    async fn update(&self, tenant_id: &str, spec: &ComputeSpec) -> Result<ProvisionResult, ComputeError> {
        debug!(tenant_id, "mock: update");
        if !self.tenants.lock().unwrap().contains_key(tenant_id) {
            return Err(ComputeError::TenantNotFound(tenant_id.to_string()));
        }
        let mut resource_ids = HashMap::new();
        resource_ids.insert("container_id".to_string(), format!("mock://{tenant_id}"));
        Ok(ProvisionResult {
            observed_config: spec.config.clone(),
            resource_ids,
        })
    }

    async fn destroy(&self, tenant_id: &str) -> Result<(), ComputeError> {
        debug!(tenant_id, "mock: destroy");
        self.tenants.lock().unwrap().remove(tenant_id);
        Ok(())
    }

    async fn get_status(&self, tenant_id: &str) -> Result<ComputeStatus, ComputeError> {
        self.tenants
            .lock()
            .unwrap()
            .get(tenant_id)
            .cloned()
            .ok_or_else(|| ComputeError::TenantNotFound(tenant_id.to_string()))
    }

    async fn validate(&self, spec: &ComputeSpec) -> Result<(), ComputeError> {
        if spec.image.trim().is_empty() {
            return Err(ComputeError::InvalidSpec("image must not be empty".into()));
        }
        Ok(())
    }

    fn validate_config(&self, raw: &ConfigValue) -> Result<(), ComputeError> {
        if raw.is_null() || raw.as_value().is_object() {
            Ok(())
        } else {
            Err(ComputeError::InvalidConfig("compute config must be an object or null".into()))
        }
    }

    fn config_schema(&self) -> ConfigValue {
        ConfigValue(json!({
            "type": "object",
            "properties": { "env": { "type": "object" } },
            "additionalProperties": true,
        }))
    }

    fn config_defaults(&self) -> ConfigValue {
        ConfigValue(json!({ "env": {} }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(tenant_id: &str) -> ComputeSpec {
        ComputeSpec {
            tenant_id: tenant_id.to_string(),
            image: "nginx:1.25".to_string(),
            config: ConfigValue::null(),
        }
    }

    #[tokio::test]
    async fn provision_then_status_running() {
        let provider = MockComputeProvider::new("mock");
        provider.provision(&spec("t1")).await.unwrap();
        assert_eq!(provider.get_status("t1").await.unwrap(), ComputeStatus::Running);
    }

    #[tokio::test]
    async fn destroy_is_idempotent() {
        let provider = MockComputeProvider::new("mock");
        provider.destroy("never-provisioned").await.unwrap();
        provider.provision(&spec("t1")).await.unwrap();
        provider.destroy("t1").await.unwrap();
        provider.destroy("t1").await.unwrap();
        assert!(provider.get_status("t1").await.is_err());
    }

    #[tokio::test]
    async fn update_requires_existing_tenant() {
        let provider = MockComputeProvider::new("mock");
        let err = provider.update("ghost", &spec("ghost")).await.unwrap_err();
        assert!(matches!(err, ComputeError::TenantNotFound(_)));
    }

    #[tokio::test]
    async fn validate_rejects_empty_image() {
        let provider = MockComputeProvider::new("mock");
        let mut s = spec("t1");
        s.image = String::new();
        assert!(provider.validate(&s).await.is_err());
    }
}
