use async_trait::async_trait;
use chrono::{DateTime, Utc};
use landlord_domain::tenant::{StateTransition, Tenant, TenantId};
use landlord_domain::{Status, WorkflowSubState};
use tokio_util::sync::CancellationToken;

use crate::error::StoreError;

/// Filters accepted by `TenantStore::list`. Every field is optional — an
/// all-`None` `ListFilters` matches every tenant.
#[derive(Debug, Clone, Default)]
pub struct ListFilters {
    pub statuses: Option<Vec<Status>>,
    pub created_before: Option<DateTime<Utc>>,
    pub created_after: Option<DateTime<Utc>>,
    pub workflow_sub_states: Option<Vec<WorkflowSubState>>,
    pub retry_count_floor: Option<u32>,
    pub error_present: Option<bool>,
    pub include_archived: bool,
    pub label_equality: Option<(String, String)>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Durable repository of tenant records and the state-transition audit log.
///
/// Every method takes a `CancellationToken`; implementations must abort
/// promptly and return `StoreError::Cancelled` once it fires.
#[async_trait]
pub trait TenantStore: Send + Sync + 'static {
    async fn create_tenant(&self, tenant: Tenant, ct: &CancellationToken) -> Result<Tenant, StoreError>;

    async fn get_by_id(&self, id: TenantId, ct: &CancellationToken) -> Result<Tenant, StoreError>;

    async fn get_by_name(&self, name: &str, ct: &CancellationToken) -> Result<Tenant, StoreError>;

    /// Compare-and-swap on `tenant.version`. On success, bumps `version` and
    /// `updated_at` and returns the persisted copy. On mismatch, fails with
    /// `VersionConflict`.
    async fn update(&self, tenant: Tenant, ct: &CancellationToken) -> Result<Tenant, StoreError>;

    async fn list(&self, filters: ListFilters, ct: &CancellationToken) -> Result<Vec<Tenant>, StoreError>;

    /// Shorthand for `status ∈ {requested, planning, provisioning, updating,
    /// deleting, archiving}` — the store may apply indexing.
    async fn list_for_reconciliation(&self, ct: &CancellationToken) -> Result<Vec<Tenant>, StoreError>;

    async fn delete(&self, id: TenantId, ct: &CancellationToken) -> Result<(), StoreError>;

    async fn record_state_transition(
        &self,
        transition: StateTransition,
        ct: &CancellationToken,
    ) -> Result<(), StoreError>;

    async fn get_state_history(
        &self,
        id: TenantId,
        ct: &CancellationToken,
    ) -> Result<Vec<StateTransition>, StoreError>;
}
