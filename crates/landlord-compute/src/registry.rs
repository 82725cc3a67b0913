use std::collections::HashMap;
use std::sync::Arc;

use crate::driver::ComputeProvider;
use crate::error::ComputeError;

/// Name→provider map. Built at process start and read-mostly thereafter:
/// `register` requires exclusive access, `get`/`names` use shared access.
#[derive(Default)]
pub struct ComputeRegistry {
    providers: HashMap<String, Arc<dyn ComputeProvider>>,
}

impl ComputeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails with `ProviderConflict` on duplicate name.
    pub fn register(&mut self, provider: Arc<dyn ComputeProvider>) -> Result<(), ComputeError> {
        let name = provider.name().to_string();
        if self.providers.contains_key(&name) {
            return Err(ComputeError::ProviderConflict(name));
        }
        self.providers.insert(name, provider);
        Ok(())
    }

    /// Fails with `ProviderNotFound` if no provider is registered under `name`.
    pub fn get(&self, name: &str) -> Result<Arc<dyn ComputeProvider>, ComputeError> {
        self.providers
            .get(name)
            .cloned()
            .ok_or_else(|| ComputeError::ProviderNotFound(name.to_string()))
    }

    pub fn names(&self) -> Vec<String> {
        self.providers.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockComputeProvider;

    #[test]
    fn register_then_get_round_trips() {
        let mut registry = ComputeRegistry::new();
        registry.register(Arc::new(MockComputeProvider::new("mock"))).unwrap();
        assert!(registry.get("mock").is_ok());
        assert!(matches!(registry.get("missing"), Err(ComputeError::ProviderNotFound(_))));
    }

    #[test]
    fn duplicate_registration_conflicts() {
        let mut registry = ComputeRegistry::new();
        registry.register(Arc::new(MockComputeProvider::new("mock"))).unwrap();
        let err = registry.register(Arc::new(MockComputeProvider::new("mock"))).unwrap_err();
        assert!(matches!(err, ComputeError::ProviderConflict(_)));
    }
}
