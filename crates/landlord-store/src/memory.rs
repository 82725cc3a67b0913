use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use landlord_domain::tenant::{StateTransition, Tenant, TenantId};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::error::StoreError;
use crate::store::{ListFilters, TenantStore};

#[derive(Debug, Default)]
struct Inner {
    tenants: HashMap<TenantId, Tenant>,
    names: HashMap<String, TenantId>,
    history: Vec<StateTransition>,
}

/// In-memory implementation of [`TenantStore`].
///
/// All data is lost on process exit — acceptable, since a crash only loses
/// the in-flight workqueue and this store together, and the next reconcile
/// cycle against a durable store rediscovers any tenant still needing work.
/// Used as the reference store for the controller's own test suite and for
/// local development.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_cancelled(ct: &CancellationToken) -> Result<(), StoreError> {
        if ct.is_cancelled() {
            Err(StoreError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl TenantStore for InMemoryStore {
    async fn create_tenant(&self, mut tenant: Tenant, ct: &CancellationToken) -> Result<Tenant, StoreError> {
        Self::check_cancelled(ct)?;
        if tenant.name.trim().is_empty() {
            return Err(StoreError::Invalid("tenant name must not be empty".into()));
        }
        let mut guard = self.inner.write().await;
        if guard.names.contains_key(&tenant.name) {
            return Err(StoreError::AlreadyExists(tenant.name.clone()));
        }
        let now = Utc::now();
        tenant.id = TenantId::new();
        tenant.created_at = now;
        tenant.updated_at = now;
        tenant.version = 1;
        guard.names.insert(tenant.name.clone(), tenant.id);
        guard.tenants.insert(tenant.id, tenant.clone());
        Ok(tenant)
    }

    async fn get_by_id(&self, id: TenantId, ct: &CancellationToken) -> Result<Tenant, StoreError> {
        Self::check_cancelled(ct)?;
        let guard = self.inner.read().await;
        guard
            .tenants
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn get_by_name(&self, name: &str, ct: &CancellationToken) -> Result<Tenant, StoreError> {
        Self::check_cancelled(ct)?;
        let guard = self.inner.read().await;
        let id = guard
            .names
            .get(name)
            .copied()
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        guard
            .tenants
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    async fn update(&self, mut tenant: Tenant, ct: &CancellationToken) -> Result<Tenant, StoreError> {
        Self::check_cancelled(ct)?;
        let mut guard = self.inner.write().await;
        let existing = guard
            .tenants
            .get(&tenant.id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(tenant.id.to_string()))?;
        if existing.version != tenant.version {
            return Err(StoreError::VersionConflict {
                expected: tenant.version,
                actual: existing.version,
            });
        }
        if existing.name != tenant.name {
            if let Some(&other) = guard.names.get(&tenant.name) {
                if other != tenant.id {
                    return Err(StoreError::AlreadyExists(tenant.name.clone()));
                }
            }
        }
        tenant.version = existing.version + 1;
        tenant.updated_at = Utc::now();
        if existing.name != tenant.name {
            guard.names.remove(&existing.name);
            guard.names.insert(tenant.name.clone(), tenant.id);
        }
        guard.tenants.insert(tenant.id, tenant.clone());
        Ok(tenant)
    }

    async fn list(&self, filters: ListFilters, ct: &CancellationToken) -> Result<Vec<Tenant>, StoreError> {
        Self::check_cancelled(ct)?;
        let guard = self.inner.read().await;
        let mut matched: Vec<Tenant> = guard
            .tenants
            .values()
            .filter(|t| matches_filters(t, &filters))
            .cloned()
            .collect();
        matched.sort_by_key(|t| t.created_at);

        let offset = filters.offset.unwrap_or(0) as usize;
        let matched = if offset >= matched.len() {
            Vec::new()
        } else {
            matched.split_off(offset)
        };
        let matched = match filters.limit {
            Some(limit) => matched.into_iter().take(limit as usize).collect(),
            None => matched,
        };
        Ok(matched)
    }

    async fn list_for_reconciliation(&self, ct: &CancellationToken) -> Result<Vec<Tenant>, StoreError> {
        Self::check_cancelled(ct)?;
        let guard = self.inner.read().await;
        Ok(guard
            .tenants
            .values()
            .filter(|t| t.status.should_reconcile())
            .cloned()
            .collect())
    }

    async fn delete(&self, id: TenantId, ct: &CancellationToken) -> Result<(), StoreError> {
        Self::check_cancelled(ct)?;
        let mut guard = self.inner.write().await;
        let tenant = guard
            .tenants
            .remove(&id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        guard.names.remove(&tenant.name);
        Ok(())
    }

    async fn record_state_transition(
        &self,
        transition: StateTransition,
        ct: &CancellationToken,
    ) -> Result<(), StoreError> {
        Self::check_cancelled(ct)?;
        let mut guard = self.inner.write().await;
        guard.history.push(transition);
        Ok(())
    }

    async fn get_state_history(
        &self,
        id: TenantId,
        ct: &CancellationToken,
    ) -> Result<Vec<StateTransition>, StoreError> {
        Self::check_cancelled(ct)?;
        let guard = self.inner.read().await;
        Ok(guard
            .history
            .iter()
            .filter(|t| t.tenant_id == id)
            .cloned()
            .collect())
    }
}

pub(crate) fn matches_filters(t: &Tenant, f: &ListFilters) -> bool {
    if !f.include_archived && t.status == landlord_domain::Status::Archived {
        return false;
    }
    if let Some(statuses) = &f.statuses {
        if !statuses.contains(&t.status) {
            return false;
        }
    }
    if let Some(before) = f.created_before {
        if t.created_at >= before {
            return false;
        }
    }
    if let Some(after) = f.created_after {
        if t.created_at <= after {
            return false;
        }
    }
    if let Some(sub_states) = &f.workflow_sub_states {
        if !sub_states.contains(&t.workflow_sub_state) {
            return false;
        }
    }
    if let Some(floor) = f.retry_count_floor {
        if t.workflow_retry_count < floor {
            return false;
        }
    }
    if let Some(want_error) = f.error_present {
        if t.workflow_error_message.is_some() != want_error {
            return false;
        }
    }
    if let Some((k, v)) = &f.label_equality {
        if t.labels.get(k) != Some(v) {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use landlord_domain::ConfigValue;
    use serde_json::json;

    fn ct() -> CancellationToken {
        CancellationToken::new()
    }

    fn dummy(name: &str) -> Tenant {
        Tenant::new(name, ConfigValue(json!({"image": "nginx"})))
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let store = InMemoryStore::new();
        let created = store.create_tenant(dummy("acme"), &ct()).await.unwrap();
        assert_eq!(created.version, 1);

        let got = store.get_by_id(created.id, &ct()).await.unwrap();
        assert_eq!(got.name, "acme");

        let by_name = store.get_by_name("acme", &ct()).await.unwrap();
        assert_eq!(by_name.id, created.id);
    }

    #[tokio::test]
    async fn duplicate_name_rejected() {
        let store = InMemoryStore::new();
        store.create_tenant(dummy("acme"), &ct()).await.unwrap();
        let err = store.create_tenant(dummy("acme"), &ct()).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn update_bumps_version_on_match() {
        let store = InMemoryStore::new();
        let t = store.create_tenant(dummy("acme"), &ct()).await.unwrap();
        let updated = store.update(t, &ct()).await.unwrap();
        assert_eq!(updated.version, 2);
    }

    #[tokio::test]
    async fn concurrent_updates_yield_one_conflict() {
        let store = InMemoryStore::new();
        let t = store.create_tenant(dummy("acme"), &ct()).await.unwrap();

        let a = t.clone();
        let b = t.clone();
        let (r1, r2) = tokio::join!(store.update(a, &ct()), store.update(b, &ct()));

        let successes = [&r1, &r2].iter().filter(|r| r.is_ok()).count();
        let conflicts = [&r1, &r2]
            .iter()
            .filter(|r| matches!(r, Err(StoreError::VersionConflict { .. })))
            .count();
        assert_eq!(successes, 1);
        assert_eq!(conflicts, 1);
    }

    #[tokio::test]
    async fn update_rename_onto_existing_name_rejected() {
        let store = InMemoryStore::new();
        store.create_tenant(dummy("acme"), &ct()).await.unwrap();
        let b = store.create_tenant(dummy("beta"), &ct()).await.unwrap();

        let mut renamed = b.clone();
        renamed.name = "acme".to_string();
        let err = store.update(renamed, &ct()).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));

        // Neither tenant's name binding was disturbed by the rejected update.
        assert_eq!(store.get_by_name("acme", &ct()).await.unwrap().name, "acme");
        assert_eq!(store.get_by_name("beta", &ct()).await.unwrap().id, b.id);
    }

    #[tokio::test]
    async fn update_stale_version_conflicts() {
        let store = InMemoryStore::new();
        let t = store.create_tenant(dummy("acme"), &ct()).await.unwrap();
        let stale = t.clone();
        store.update(t, &ct()).await.unwrap();
        let err = store.update(stale, &ct()).await.unwrap_err();
        assert!(matches!(err, StoreError::VersionConflict { expected: 1, actual: 2 }));
    }

    #[tokio::test]
    async fn list_for_reconciliation_excludes_terminal() {
        let store = InMemoryStore::new();
        store.create_tenant(dummy("a"), &ct()).await.unwrap();
        let mut ready = dummy("b");
        ready.status = landlord_domain::Status::Ready;
        store.create_tenant(ready, &ct()).await.unwrap();

        let list = store.list_for_reconciliation(&ct()).await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].name, "a");
    }

    #[tokio::test]
    async fn list_excludes_archived_unless_requested() {
        let store = InMemoryStore::new();
        let mut archived = dummy("gone");
        archived.status = landlord_domain::Status::Archived;
        store.create_tenant(archived, &ct()).await.unwrap();

        let default_list = store.list(ListFilters::default(), &ct()).await.unwrap();
        assert!(default_list.is_empty());

        let with_archived = store
            .list(ListFilters { include_archived: true, ..Default::default() }, &ct())
            .await
            .unwrap();
        assert_eq!(with_archived.len(), 1);
    }

    #[tokio::test]
    async fn delete_removes_tenant_and_name() {
        let store = InMemoryStore::new();
        let t = store.create_tenant(dummy("acme"), &ct()).await.unwrap();
        store.delete(t.id, &ct()).await.unwrap();
        assert!(store.get_by_id(t.id, &ct()).await.is_err());
        assert!(store.get_by_name("acme", &ct()).await.is_err());
    }

    #[tokio::test]
    async fn state_history_is_append_only_and_filtered() {
        let store = InMemoryStore::new();
        let t1 = store.create_tenant(dummy("a"), &ct()).await.unwrap();
        let t2 = store.create_tenant(dummy("b"), &ct()).await.unwrap();

        store
            .record_state_transition(
                StateTransition::new(t1.id, landlord_domain::Status::Requested, landlord_domain::Status::Provisioning, "started"),
                &ct(),
            )
            .await
            .unwrap();
        store
            .record_state_transition(
                StateTransition::new(t2.id, landlord_domain::Status::Requested, landlord_domain::Status::Provisioning, "started"),
                &ct(),
            )
            .await
            .unwrap();

        let history = store.get_state_history(t1.id, &ct()).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].tenant_id, t1.id);
    }

    #[tokio::test]
    async fn cancelled_token_aborts_operations() {
        let store = InMemoryStore::new();
        let token = ct();
        token.cancel();
        let err = store.list(ListFilters::default(), &token).await.unwrap_err();
        assert!(matches!(err, StoreError::Cancelled));
    }
}
