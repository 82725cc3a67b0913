use std::collections::HashMap;
use std::sync::Arc;

use crate::error::WorkflowError;
use crate::provider::WorkflowProvider;

/// Name→provider map, built at startup and read-mostly thereafter.
#[derive(Default)]
pub struct WorkflowRegistry {
    providers: HashMap<String, Arc<dyn WorkflowProvider>>,
}

impl WorkflowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails with `ProviderConflict` on duplicate name.
    pub fn register(&mut self, provider: Arc<dyn WorkflowProvider>) -> Result<(), WorkflowError> {
        let name = provider.name().to_string();
        if self.providers.contains_key(&name) {
            return Err(WorkflowError::ProviderConflict(name));
        }
        self.providers.insert(name, provider);
        Ok(())
    }

    /// Fails with `ProviderNotFound` if no provider is registered under `name`.
    pub fn get(&self, name: &str) -> Result<Arc<dyn WorkflowProvider>, WorkflowError> {
        self.providers
            .get(name)
            .cloned()
            .ok_or_else(|| WorkflowError::ProviderNotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryWorkflowProvider;
    use landlord_compute::MockComputeProvider;

    #[test]
    fn register_then_get_round_trips() {
        let mut registry = WorkflowRegistry::new();
        let compute = Arc::new(MockComputeProvider::new("mock"));
        registry
            .register(Arc::new(InMemoryWorkflowProvider::new("stepfn", compute)))
            .unwrap();
        assert!(registry.get("stepfn").is_ok());
        assert!(matches!(registry.get("missing"), Err(WorkflowError::ProviderNotFound(_))));
    }
}
