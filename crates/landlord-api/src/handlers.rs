use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use landlord_domain::tenant::{StateTransition, Tenant, TenantId};
use landlord_domain::{validate_transition, ConfigValue, Status};
use landlord_store::{ListFilters, StoreError};
use landlord_workflow::{TriggerSource, WorkflowAction};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

// ── Health ──────────────────────────────────────────────────────────────────

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn ready(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.store.list(ListFilters::default(), &CancellationToken::new()).await?;
    Ok(StatusCode::OK)
}

// ── Wire shapes ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateTenantBody {
    pub name: String,
    pub desired_config: Value,
    #[serde(default)]
    pub compute_config: Option<Value>,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub annotations: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTenantBody {
    pub version: u64,
    #[serde(default)]
    pub desired_config: Option<Value>,
    #[serde(default)]
    pub compute_config: Option<Value>,
    #[serde(default)]
    pub labels: Option<HashMap<String, String>>,
    #[serde(default)]
    pub annotations: Option<HashMap<String, String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ArchiveQuery {
    #[serde(default)]
    pub version: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub status: Option<Status>,
    #[serde(default)]
    pub include_archived: bool,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct TenantView {
    #[serde(flatten)]
    pub tenant: Tenant,
}

fn parse_id(raw: &str) -> Result<TenantId, ApiError> {
    Uuid::parse_str(raw)
        .map(TenantId)
        .map_err(|_| ApiError::bad_request(format!("invalid tenant id {raw:?}")))
}

/// Synchronously triggers `action` against `tenant` with `trigger_source =
/// api`, mirroring what the controller does on its next reconcile pass so
/// the two trigger sources agree on the idempotency key.
/// Failures are swallowed here and left for the controller to retry — the
/// tenant row is still persisted and reconcilable either way.
async fn trigger_workflow(
    state: &AppState,
    tenant: &mut Tenant,
    action: WorkflowAction,
    to_status: Status,
) {
    let (input, config_hash) = landlord_workflow::build_trigger(tenant, action, TriggerSource::Api);
    match state.workflow.start_execution(&action.workflow_id(), &input).await {
        Ok(handle) => {
            tenant.status = to_status;
            tenant.workflow_execution_id = Some(handle.execution_id);
            tenant.workflow_config_hash = Some(config_hash);
            tenant.workflow_sub_state = landlord_domain::WorkflowSubState::Waiting;
            tenant.workflow_retry_count = 0;
            tenant.workflow_error_message = None;
        }
        Err(e) => {
            warn!(tenant_id = %tenant.id, action = %action, error = %e, "api-triggered start_execution failed, leaving for controller");
        }
    }
}

// ── Tenant CRUD ───────────────────────────────────────────────────────────────

pub async fn create_tenant(
    State(state): State<AppState>,
    Json(body): Json<CreateTenantBody>,
) -> Result<(StatusCode, Json<TenantView>), ApiError> {
    let ct = CancellationToken::new();
    let mut tenant = Tenant::new(body.name, ConfigValue(body.desired_config));
    tenant.compute_config = body.compute_config.map(ConfigValue);
    tenant.labels = body.labels;
    tenant.annotations = body.annotations;

    let mut created = state.store.create_tenant(tenant, &ct).await?;

    let from_status = created.status;
    validate_transition(from_status, Status::Provisioning)?;
    trigger_workflow(&state, &mut created, WorkflowAction::Provision, Status::Provisioning).await;

    if created.status != from_status {
        created = state.store.update(created, &ct).await?;
        let transition = StateTransition::new(
            created.id,
            from_status,
            created.status,
            "api: create_tenant triggered provisioning",
        );
        state.store.record_state_transition(transition, &ct).await?;
    }

    Ok((StatusCode::CREATED, Json(TenantView { tenant: created })))
}

pub async fn get_tenant(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TenantView>, ApiError> {
    let id = parse_id(&id)?;
    let tenant = state.store.get_by_id(id, &CancellationToken::new()).await?;
    Ok(Json(TenantView { tenant }))
}

pub async fn get_tenant_by_name(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<TenantView>, ApiError> {
    let tenant = state.store.get_by_name(&name, &CancellationToken::new()).await?;
    Ok(Json(TenantView { tenant }))
}

pub async fn list_tenants(
    State(state): State<AppState>,
    Query(q): Query<ListQuery>,
) -> Result<Json<Vec<TenantView>>, ApiError> {
    let filters = ListFilters {
        statuses: q.status.map(|s| vec![s]),
        include_archived: q.include_archived,
        limit: q.limit,
        offset: q.offset,
        ..Default::default()
    };
    let tenants = state.store.list(filters, &CancellationToken::new()).await?;
    Ok(Json(tenants.into_iter().map(|tenant| TenantView { tenant }).collect()))
}

pub async fn update_tenant(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateTenantBody>,
) -> Result<Json<TenantView>, ApiError> {
    let id = parse_id(&id)?;
    let ct = CancellationToken::new();
    let mut tenant = state.store.get_by_id(id, &ct).await?;

    if tenant.version != body.version {
        return Err(StoreError::VersionConflict { expected: body.version, actual: tenant.version }.into());
    }

    let from_status = tenant.status;
    let mut config_changed = false;
    if let Some(desired) = body.desired_config {
        tenant.desired_config = ConfigValue(desired);
        config_changed = true;
    }
    if let Some(compute) = body.compute_config {
        tenant.compute_config = Some(ConfigValue(compute));
        config_changed = true;
    }
    if let Some(labels) = body.labels {
        tenant.labels = labels;
    }
    if let Some(annotations) = body.annotations {
        tenant.annotations = annotations;
    }

    if config_changed && from_status == Status::Ready {
        validate_transition(from_status, Status::Updating)?;
        trigger_workflow(&state, &mut tenant, WorkflowAction::Update, Status::Updating).await;
    }

    let updated = state.store.update(tenant, &ct).await?;
    if updated.status != from_status {
        let transition = StateTransition::new(
            updated.id,
            from_status,
            updated.status,
            "api: update_tenant triggered update workflow",
        );
        state.store.record_state_transition(transition, &ct).await?;
    }
    Ok(Json(TenantView { tenant: updated }))
}

pub async fn archive_tenant(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(q): Query<ArchiveQuery>,
) -> Result<Json<TenantView>, ApiError> {
    let id = parse_id(&id)?;
    let ct = CancellationToken::new();
    let tenant = state.store.get_by_id(id, &ct).await?;

    if let Some(expected) = q.version {
        if tenant.version != expected {
            return Err(StoreError::VersionConflict { expected, actual: tenant.version }.into());
        }
    }

    let from_status = tenant.status;
    let mut tenant = tenant;
    validate_transition(from_status, Status::Archiving)?;
    tenant.status = Status::Archiving;

    let updated = state.store.update(tenant, &ct).await?;
    let transition = StateTransition::new(updated.id, from_status, Status::Archiving, "api: archive_tenant");
    state.store.record_state_transition(transition, &ct).await?;
    Ok(Json(TenantView { tenant: updated }))
}

pub async fn delete_tenant(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;
    state.store.delete(id, &CancellationToken::new()).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_tenant_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<StateTransition>>, ApiError> {
    let id = parse_id(&id)?;
    let history = state.store.get_state_history(id, &CancellationToken::new()).await?;
    Ok(Json(history))
}
