use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use landlord_domain::hash::compute_desired_hash;
use landlord_domain::state_machine::{next_status, validate_transition};
use landlord_domain::tenant::{StateTransition, Tenant, TenantId, WorkflowSubState};
use landlord_domain::Status;
use landlord_store::{StoreError, TenantStore};
use landlord_workflow::execution::{ExecutionInput, ExecutionState, ExecutionStatus};
use landlord_workflow::spec::{TriggerSource, WorkflowAction};
use landlord_workflow::{WorkflowError, WorkflowManager};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::workqueue::WorkQueue;

/// Shared, read-mostly dependencies a reconcile step needs — handed to every
/// worker, never mutated after construction.
pub struct ReconcileContext {
    pub store: Arc<dyn TenantStore>,
    pub workflow: Arc<WorkflowManager>,
    pub queue: Arc<WorkQueue<TenantId>>,
    pub max_retries: u32,
    pub workflow_trigger_timeout: Duration,
}

/// What the reconcile step decided to do with the workqueue item once this
/// call returns. Every exit path resolves to exactly one of these so the
/// `Get`/`Done` contract is never violated.
enum Outcome {
    /// Success with nothing further expected soon: forget the failure
    /// counter, mark the item done.
    Settled,
    /// Leave the failure counter alone, mark the item done. Used when no
    /// progress was made but none was expected either (e.g. a running
    /// execution left alone, or a retry-ceiling not yet reached — the
    /// latter already scheduled its own rate-limited re-add).
    Parked,
    /// A version conflict on write-back: forget the failure counter (a
    /// conflict isn't a workflow failure) and re-add immediately for a
    /// fresh pass, per spec step 4's "Forget(id) and Add(id)".
    Requeue,
    /// Progress succeeded (a workflow was started) and deserves a prompt
    /// follow-up poll: forget the failure counter and re-add immediately.
    SucceededRequeue,
    /// A transient failure; back off exponentially and mark done.
    RateLimited,
    /// Shutting down; don't touch the queue at all.
    Cancelled,
}

fn finish(ctx: &ReconcileContext, id: TenantId, outcome: Outcome) {
    match outcome {
        Outcome::Settled => {
            ctx.queue.forget(&id);
            ctx.queue.done(&id);
        }
        Outcome::Parked => {
            ctx.queue.done(&id);
        }
        Outcome::Requeue => {
            ctx.queue.forget(&id);
            ctx.queue.add(id);
            ctx.queue.done(&id);
        }
        Outcome::SucceededRequeue => {
            ctx.queue.forget(&id);
            ctx.queue.add(id);
            ctx.queue.done(&id);
        }
        Outcome::RateLimited => {
            ctx.queue.add_rate_limited(id);
            ctx.queue.done(&id);
        }
        Outcome::Cancelled => {}
    }
}

/// The per-item reconcile step, called by a worker once per dequeued tenant
/// ID; never called concurrently for the same ID because the workqueue
/// dedups.
pub async fn reconcile_tenant(ctx: &ReconcileContext, id: TenantId, ct: &CancellationToken) {
    if ct.is_cancelled() {
        return finish(ctx, id, Outcome::Cancelled);
    }

    // 1. Fetch.
    let tenant = match ctx.store.get_by_id(id, ct).await {
        Ok(t) => t,
        Err(StoreError::NotFound(_)) => {
            debug!(tenant_id = %id, "reconcile: tenant vanished, forgetting");
            return finish(ctx, id, Outcome::Settled);
        }
        Err(StoreError::Cancelled) => return finish(ctx, id, Outcome::Cancelled),
        Err(e) if e.is_retryable() => {
            warn!(tenant_id = %id, error = %e, "reconcile: transient store error fetching tenant");
            return finish(ctx, id, Outcome::RateLimited);
        }
        Err(e) => {
            warn!(tenant_id = %id, error = %e, "reconcile: non-retryable store error fetching tenant");
            return finish(ctx, id, Outcome::Settled);
        }
    };

    // 2. Short-circuit on terminal, except `ready` with config drift: a
    // tenant whose ComputeConfig changed after it settled is enqueued
    // directly by an API update handler, bypassing the poll-based
    // discovery that only lists the reconcilable set. WorkflowConfigHash
    // is deliberately preserved through the terminal-success transition
    // (see `handle_terminal_execution`) so this comparison is meaningful.
    if tenant.status.is_terminal() {
        if tenant.status == Status::Ready && has_config_drift(&tenant) {
            return trigger_new_workflow(ctx, tenant, ct).await;
        }
        if tenant.workflow_sub_state != WorkflowSubState::None {
            return clear_stale_sub_state(ctx, tenant, ct).await;
        }
        return finish(ctx, id, Outcome::Settled);
    }

    // 3/4. No active execution ⇒ trigger. Otherwise poll.
    if !tenant.has_active_execution() {
        trigger_new_workflow(ctx, tenant, ct).await
    } else {
        poll_active_execution(ctx, tenant, ct).await
    }
}

fn has_config_drift(tenant: &Tenant) -> bool {
    let current = compute_desired_hash(&tenant.desired_config, tenant.compute_config.as_ref());
    tenant.workflow_config_hash.as_deref() != Some(current.as_str())
}

/// Clears a one-cycle-preserved `succeeded` sub-state once a terminal tenant
/// is observed settled a second time.
async fn clear_stale_sub_state(ctx: &ReconcileContext, tenant: Tenant, ct: &CancellationToken) {
    let id = tenant.id;
    let mut updated = tenant;
    updated.workflow_sub_state = WorkflowSubState::None;
    match ctx.store.update(updated, ct).await {
        Ok(_) => finish(ctx, id, Outcome::Settled),
        Err(StoreError::VersionConflict { .. }) => finish(ctx, id, Outcome::Requeue),
        Err(e) if e.is_retryable() => finish(ctx, id, Outcome::RateLimited),
        Err(_) => finish(ctx, id, Outcome::Settled),
    }
}

async fn poll_active_execution(ctx: &ReconcileContext, tenant: Tenant, ct: &CancellationToken) {
    let id = tenant.id;
    let execution_id = tenant
        .workflow_execution_id
        .clone()
        .expect("has_active_execution guarantees Some");

    let status = timeout_call(
        ctx.workflow_trigger_timeout,
        ctx.workflow.get_execution_status(&execution_id),
    )
    .await;

    match status {
        Err(WorkflowError::ExecutionNotFound(_)) => {
            let mut cleared = tenant;
            cleared.workflow_execution_id = None;
            match ctx.store.update(cleared, ct).await {
                Ok(fresh) => trigger_new_workflow(ctx, fresh, ct).await,
                Err(StoreError::VersionConflict { .. }) => finish(ctx, id, Outcome::Requeue),
                Err(e) if e.is_retryable() => finish(ctx, id, Outcome::RateLimited),
                Err(_) => finish(ctx, id, Outcome::Settled),
            }
        }
        Err(e) if !e.is_retryable() => {
            transition_to_failed(ctx, tenant, e.to_string(), ct).await;
        }
        Err(e) => {
            warn!(tenant_id = %id, error = %e, "reconcile: transient error polling execution status");
            finish(ctx, id, Outcome::RateLimited);
        }
        Ok(status) => handle_execution_status(ctx, tenant, status, ct).await,
    }
}

async fn handle_execution_status(
    ctx: &ReconcileContext,
    tenant: Tenant,
    status: ExecutionStatus,
    ct: &CancellationToken,
) {
    let id = tenant.id;

    if status.state.is_terminal() {
        return handle_terminal_execution(ctx, tenant, status, ct).await;
    }

    let observed_differs = tenant.workflow_sub_state != status.sub_state
        || tenant.workflow_retry_count != status.retry_count
        || tenant.workflow_error_message != status.error_message;

    let tenant = if observed_differs {
        let mut updated = tenant;
        updated.workflow_sub_state = status.sub_state;
        updated.workflow_retry_count = status.retry_count;
        updated.workflow_error_message = status.error_message.clone();
        match ctx.store.update(updated, ct).await {
            Ok(fresh) => fresh,
            Err(StoreError::VersionConflict { .. }) => return finish(ctx, id, Outcome::Requeue),
            Err(e) if e.is_retryable() => return finish(ctx, id, Outcome::RateLimited),
            Err(_) => return finish(ctx, id, Outcome::Settled),
        }
    } else {
        tenant
    };

    if status.sub_state.is_degraded() {
        if has_config_drift(&tenant) {
            handle_config_drift(ctx, tenant, ct).await
        } else {
            // Backoff already in progress inside the provider; nothing to do.
            finish(ctx, id, Outcome::Parked)
        }
    } else {
        // Running proper, or waiting/pending — don't interrupt, the next
        // poll cycle will re-enqueue.
        finish(ctx, id, Outcome::Parked)
    }
}

/// Stops a degraded execution whose config has drifted, waits for it to
/// settle, clears the execution off the tenant, then triggers a fresh one.
async fn handle_config_drift(ctx: &ReconcileContext, tenant: Tenant, ct: &CancellationToken) {
    let id = tenant.id;
    let execution_id = tenant
        .workflow_execution_id
        .clone()
        .expect("has_active_execution guarantees Some");

    if let Err(e) = timeout_call(
        ctx.workflow_trigger_timeout,
        ctx.workflow.stop_execution(&execution_id, "Configuration updated"),
    )
    .await
    {
        if e.is_retryable() {
            warn!(tenant_id = %id, error = %e, "reconcile: transient error stopping drifted execution");
            return finish(ctx, id, Outcome::RateLimited);
        }
        return transition_to_failed(ctx, tenant, e.to_string(), ct).await;
    }

    // Provider's stop_execution is expected to settle promptly; poll a
    // bounded number of times in case the provider transitions asynchronously.
    for _ in 0..10 {
        match ctx.workflow.get_execution_status(&execution_id).await {
            Ok(status) if status.state.is_terminal() => break,
            Ok(_) => tokio::time::sleep(Duration::from_millis(20)).await,
            Err(_) => break,
        }
    }

    let mut cleared = tenant;
    cleared.workflow_execution_id = None;
    cleared.workflow_retry_count = 0;
    match ctx.store.update(cleared, ct).await {
        Ok(fresh) => trigger_new_workflow(ctx, fresh, ct).await,
        Err(StoreError::VersionConflict { .. }) => finish(ctx, id, Outcome::Requeue),
        Err(e) if e.is_retryable() => finish(ctx, id, Outcome::RateLimited),
        Err(_) => finish(ctx, id, Outcome::Settled),
    }
}

/// Terminal-execution handling.
async fn handle_terminal_execution(
    ctx: &ReconcileContext,
    tenant: Tenant,
    status: ExecutionStatus,
    ct: &CancellationToken,
) {
    let id = tenant.id;

    if status.state == ExecutionState::Succeeded {
        let Some(next) = next_status(tenant.status) else {
            return finish(ctx, id, Outcome::Settled);
        };
        if validate_transition(tenant.status, next).is_err() {
            warn!(tenant_id = %id, from = %tenant.status, to = %next, "reconcile: natural successor rejected by state machine");
            return finish(ctx, id, Outcome::Settled);
        }

        let from = tenant.status;
        let mut updated = tenant;
        updated.status = next;
        updated.workflow_execution_id = None;
        updated.workflow_retry_count = 0;
        updated.workflow_error_message = None;
        // Preserved for exactly one more cycle for observability, then
        // cleared by `clear_stale_sub_state` on the immediate follow-up pass
        // this update schedules (step-2's short-circuit branch) — `next` is
        // terminal, so the tenant would otherwise never reappear via
        // `list_for_reconciliation` and the clear would never run.
        // WorkflowConfigHash is intentionally left untouched — it is the
        // baseline future drift detection compares against.
        updated.workflow_sub_state = WorkflowSubState::Succeeded;
        updated.status_message = Some("workflow succeeded".to_string());

        match ctx.store.update(updated, ct).await {
            Ok(persisted) => {
                let _ = ctx
                    .store
                    .record_state_transition(
                        StateTransition::new(persisted.id, from, next, "workflow succeeded"),
                        ct,
                    )
                    .await;
                info!(tenant_id = %id, from = %from, to = %next, "reconcile: workflow succeeded");
                finish(ctx, id, Outcome::SucceededRequeue)
            }
            Err(StoreError::VersionConflict { .. }) => finish(ctx, id, Outcome::Requeue),
            Err(e) if e.is_retryable() => finish(ctx, id, Outcome::RateLimited),
            Err(_) => finish(ctx, id, Outcome::Settled),
        }
    } else {
        // failed / timed_out / cancelled
        let observed = ctx.queue.num_requeues(&id);
        if observed < ctx.max_retries {
            warn!(
                tenant_id = %id,
                attempt = observed + 1,
                max_retries = ctx.max_retries,
                error = ?status.error_message,
                "reconcile: workflow execution terminally failed, retrying"
            );
            finish(ctx, id, Outcome::RateLimited)
        } else {
            let from = tenant.status;
            let mut updated = tenant;
            updated.workflow_retry_count = observed;
            updated.workflow_error_message = status
                .error_message
                .clone()
                .or(Some("workflow execution failed".to_string()));
            updated.status_message = Some("max retries exceeded".to_string());
            updated.status = Status::Failed;

            match ctx.store.update(updated, ct).await {
                Ok(persisted) => {
                    let _ = ctx
                        .store
                        .record_state_transition(
                            StateTransition::new(persisted.id, from, Status::Failed, "max retries exceeded")
                                .with_error(status.error_message.unwrap_or_default()),
                            ct,
                        )
                        .await;
                    warn!(tenant_id = %id, "reconcile: max retries exceeded, tenant failed");
                    finish(ctx, id, Outcome::Settled)
                }
                Err(StoreError::VersionConflict { .. }) => finish(ctx, id, Outcome::Requeue),
                Err(e) if e.is_retryable() => finish(ctx, id, Outcome::RateLimited),
                Err(_) => finish(ctx, id, Outcome::Settled),
            }
        }
    }
}

async fn transition_to_failed(ctx: &ReconcileContext, tenant: Tenant, message: String, ct: &CancellationToken) {
    let id = tenant.id;
    let from = tenant.status;
    if validate_transition(from, Status::Failed).is_err() {
        warn!(tenant_id = %id, from = %from, "reconcile: cannot transition to failed from this status");
        return finish(ctx, id, Outcome::Settled);
    }

    let mut updated = tenant;
    updated.status = Status::Failed;
    updated.status_message = Some(message.clone());
    updated.workflow_error_message = Some(message.clone());

    match ctx.store.update(updated, ct).await {
        Ok(persisted) => {
            let _ = ctx
                .store
                .record_state_transition(
                    StateTransition::new(persisted.id, from, Status::Failed, "non-retryable error").with_error(message),
                    ct,
                )
                .await;
            finish(ctx, id, Outcome::Settled)
        }
        Err(StoreError::VersionConflict { .. }) => finish(ctx, id, Outcome::Requeue),
        Err(e) if e.is_retryable() => finish(ctx, id, Outcome::RateLimited),
        Err(_) => finish(ctx, id, Outcome::Settled),
    }
}

/// The action + expected successor status for a tenant about to trigger a
/// new workflow. `None` means there is nothing to do — the reconcile step
/// settles without starting anything.
fn action_for(status: Status) -> Option<(WorkflowAction, Status)> {
    match status {
        Status::Requested | Status::Planning => Some((WorkflowAction::Provision, Status::Provisioning)),
        // Execution vanished mid-provisioning (e.g. engine restart) — resume
        // the same action rather than re-deriving a successor that doesn't
        // exist for an already-in-progress status.
        Status::Provisioning => Some((WorkflowAction::Provision, Status::Provisioning)),
        Status::Ready => Some((WorkflowAction::Update, Status::Updating)),
        Status::Updating => Some((WorkflowAction::Update, Status::Updating)),
        Status::Deleting => Some((WorkflowAction::Delete, Status::Deleting)),
        Status::Archiving => Some((WorkflowAction::Archive, Status::Archiving)),
        Status::Archived | Status::Failed => None,
    }
}

/// Trigger a new workflow.
async fn trigger_new_workflow(ctx: &ReconcileContext, tenant: Tenant, ct: &CancellationToken) {
    let id = tenant.id;
    let Some((action, expected_successor)) = action_for(tenant.status) else {
        return finish(ctx, id, Outcome::Settled);
    };

    let (input, config_hash) = landlord_workflow::build_trigger(&tenant, action, TriggerSource::Controller);
    let workflow_id = action.workflow_id();
    let started = timeout_call(
        ctx.workflow_trigger_timeout,
        ctx.workflow.start_execution(&workflow_id, &input),
    )
    .await;

    match started {
        Ok(handle) => {
            let from = tenant.status;
            let mut updated = tenant;
            let status_changed = from != expected_successor;
            if status_changed {
                if let Err(e) = validate_transition(from, expected_successor) {
                    warn!(tenant_id = %id, error = %e, "reconcile: computed successor rejected by state machine");
                    return finish(ctx, id, Outcome::Settled);
                }
                updated.status = expected_successor;
            }
            updated.workflow_execution_id = Some(handle.execution_id);
            updated.workflow_config_hash = Some(config_hash);
            updated.workflow_retry_count = 0;
            updated.workflow_error_message = None;
            updated.status_message = Some("workflow started".to_string());

            match ctx.store.update(updated, ct).await {
                Ok(persisted) => {
                    if status_changed {
                        let _ = ctx
                            .store
                            .record_state_transition(
                                StateTransition::new(persisted.id, from, expected_successor, "workflow started"),
                                ct,
                            )
                            .await;
                    }
                    info!(tenant_id = %id, action = %action, "reconcile: workflow triggered");
                    // Prompt follow-up poll rather than waiting a full
                    // lister interval — the execution may already be
                    // terminal by the time we ask. A successful trigger also
                    // clears any failure count a prior transient error left
                    // behind, since the retry ceiling tracks failures to
                    // make progress, not this one-time follow-up.
                    finish(ctx, id, Outcome::SucceededRequeue)
                }
                Err(StoreError::VersionConflict { .. }) => finish(ctx, id, Outcome::Requeue),
                Err(e) if e.is_retryable() => finish(ctx, id, Outcome::RateLimited),
                Err(_) => finish(ctx, id, Outcome::Settled),
            }
        }
        Err(e) if !e.is_retryable() => transition_to_failed(ctx, tenant, e.to_string(), ct).await,
        Err(e) => {
            warn!(tenant_id = %id, action = %action, error = %e, "reconcile: transient error starting workflow execution");
            finish(ctx, id, Outcome::RateLimited)
        }
    }
}

async fn timeout_call<F, T>(timeout: Duration, fut: F) -> Result<T, WorkflowError>
where
    F: std::future::Future<Output = Result<T, WorkflowError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(WorkflowError::Transient("workflow trigger call timed out".to_string())),
    }
}
