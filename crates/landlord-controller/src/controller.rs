use std::sync::Arc;
use std::time::Duration;

use landlord_store::TenantStore;
use landlord_workflow::WorkflowManager;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::reconcile::{reconcile_tenant, ReconcileContext};
use crate::workqueue::WorkQueue;
use crate::ControllerConfig;

/// The reconciliation controller: one lister task polling the
/// store on a fixed interval, one rate-limited deduplicating workqueue, and a
/// fixed worker pool draining it. `run` blocks until `shutdown` fires and
/// every worker has drained its current item (bounded by
/// `shutdown_grace_period`).
pub struct Controller {
    config: ControllerConfig,
    ctx: Arc<ReconcileContext>,
}

impl Controller {
    /// Wires a controller from its three leaf dependencies. Callers must
    /// register at least one workflow provider and one compute provider
    /// (and create the per-action workflows) before calling `run`. Startup
    /// ordering is the caller's responsibility, not the controller's, since
    /// it depends on which providers are configured.
    pub fn new(config: ControllerConfig, store: Arc<dyn TenantStore>, workflow: Arc<WorkflowManager>) -> Self {
        let queue = WorkQueue::new(config.rate_limit_base, config.rate_limit_max);
        let ctx = Arc::new(ReconcileContext {
            store,
            workflow,
            queue,
            max_retries: config.max_retries,
            workflow_trigger_timeout: config.workflow_trigger_timeout,
        });
        Controller { config, ctx }
    }

    /// Runs the controller until `shutdown` is cancelled. Returns once every
    /// worker and the lister have stopped. A no-op (returns immediately) when
    /// `config.enabled` is `false`.
    pub async fn run(&self, shutdown: CancellationToken) {
        if !self.config.enabled {
            info!("controller disabled, not starting");
            return;
        }

        info!(
            worker_count = self.config.worker_count,
            reconciliation_interval = ?self.config.reconciliation_interval,
            "controller starting"
        );

        let mut workers = JoinSet::new();
        for worker_id in 0..self.config.worker_count.max(1) {
            let ctx = Arc::clone(&self.ctx);
            let ct = shutdown.clone();
            workers.spawn(async move { Self::worker_loop(worker_id, ctx, ct).await });
        }

        let lister = {
            let ctx = Arc::clone(&self.ctx);
            let ct = shutdown.clone();
            let interval = self.config.reconciliation_interval;
            tokio::spawn(async move { Self::lister_loop(ctx, interval, ct).await })
        };

        shutdown.cancelled().await;
        info!("shutdown signalled, draining workers");
        self.ctx.queue.shut_down();

        let _ = lister.await;

        let grace = self.config.shutdown_grace_period;
        match tokio::time::timeout(grace, async {
            while workers.join_next().await.is_some() {}
        })
        .await
        {
            Ok(()) => info!("controller stopped cleanly"),
            Err(_) => {
                warn!(
                    remaining = workers.len(),
                    grace_period = ?grace,
                    "shutdown grace period elapsed with workers still draining, abandoning"
                );
                workers.abort_all();
            }
        }
    }

    /// Polls `list_for_reconciliation` on a fixed interval and adds every
    /// result to the workqueue. Dedup means a tenant already
    /// queued or mid-processing is unaffected by a redundant `Add`.
    async fn lister_loop(ctx: Arc<ReconcileContext>, interval: Duration, ct: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = ct.cancelled() => {
                    debug!("lister stopping");
                    return;
                }
                _ = ticker.tick() => {
                    match ctx.store.list_for_reconciliation(&ct).await {
                        Ok(tenants) => {
                            debug!(count = tenants.len(), "lister: enqueuing reconcilable tenants");
                            for t in tenants {
                                ctx.queue.add(t.id);
                            }
                        }
                        Err(e) => {
                            warn!(error = %e, "lister: failed to list reconcilable tenants");
                        }
                    }
                }
            }
        }
    }

    /// One worker: blocks on `queue.get()`, reconciles the dequeued tenant,
    /// and loops until the queue is shut down.
    async fn worker_loop(worker_id: usize, ctx: Arc<ReconcileContext>, ct: CancellationToken) {
        debug!(worker_id, "worker starting");
        loop {
            let Some(id) = ctx.queue.get().await else {
                debug!(worker_id, "worker exiting, queue shut down");
                return;
            };
            reconcile_tenant(&ctx, id, &ct).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use landlord_compute::MockComputeProvider;
    use landlord_domain::{ConfigValue, Status, Tenant};
    use landlord_store::InMemoryStore;
    use landlord_workflow::memory::InMemoryWorkflowProvider;
    use landlord_workflow::spec::WorkflowAction;
    use landlord_workflow::{WorkflowRegistry, WorkflowSpec};
    use serde_json::json;

    async fn test_controller() -> (Arc<InMemoryStore>, Controller) {
        let store = Arc::new(InMemoryStore::new());
        let compute = Arc::new(MockComputeProvider::new("mock"));
        let provider = Arc::new(InMemoryWorkflowProvider::new("ref", compute));
        let mut registry = WorkflowRegistry::new();
        registry.register(provider).unwrap();
        let manager = Arc::new(WorkflowManager::new(Arc::new(registry), "ref"));

        for action in [
            WorkflowAction::Provision,
            WorkflowAction::Update,
            WorkflowAction::Delete,
            WorkflowAction::Archive,
        ] {
            manager
                .create_workflow(&WorkflowSpec {
                    workflow_id: action.workflow_id(),
                    name: format!("{action}"),
                    definition: b"noop".to_vec(),
                    timeout: None,
                })
                .await
                .unwrap();
        }

        let mut config = ControllerConfig::default();
        config.reconciliation_interval = Duration::from_millis(10);
        config.shutdown_grace_period = Duration::from_millis(500);
        let controller = Controller::new(config, store.clone(), manager);
        (store, controller)
    }

    #[tokio::test]
    async fn disabled_controller_returns_immediately() {
        let (store, _unused) = test_controller().await;
        let compute = Arc::new(MockComputeProvider::new("mock"));
        let provider = Arc::new(InMemoryWorkflowProvider::new("ref", compute));
        let mut registry = WorkflowRegistry::new();
        registry.register(provider).unwrap();
        let manager = Arc::new(WorkflowManager::new(Arc::new(registry), "ref"));
        let mut config = ControllerConfig::default();
        config.enabled = false;
        let controller = Controller::new(config, store, manager);
        let shutdown = CancellationToken::new();
        tokio::time::timeout(Duration::from_millis(200), controller.run(shutdown))
            .await
            .expect("disabled controller must return promptly");
    }

    #[tokio::test]
    async fn lister_discovers_and_worker_reconciles_to_ready() {
        let (store, controller) = test_controller().await;
        let ct = CancellationToken::new();

        let created = store
            .create_tenant(Tenant::new("acme", ConfigValue(json!({"image": "nginx:1.25"}))), &ct)
            .await
            .unwrap();

        let shutdown = CancellationToken::new();
        let run_handle = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move { controller.run(shutdown).await })
        };

        let mut settled = false;
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let t = store.get_by_id(created.id, &ct).await.unwrap();
            if t.status == Status::Ready {
                settled = true;
                break;
            }
        }
        assert!(settled, "tenant did not reach Ready via the running controller");

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(2), run_handle)
            .await
            .expect("controller did not shut down within grace period")
            .unwrap();
    }

    #[tokio::test]
    async fn shutdown_stops_lister_and_workers_promptly() {
        let (store, controller) = test_controller().await;
        let shutdown = CancellationToken::new();
        let run_handle = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move { controller.run(shutdown).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(2), run_handle)
            .await
            .expect("controller did not shut down within grace period")
            .unwrap();
        drop(store);
    }
}
