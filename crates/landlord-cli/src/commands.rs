use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use landlord_compute::MockComputeProvider;
use landlord_config::StoreBackend;
use landlord_controller::Controller;
use landlord_store::{InMemoryStore, PostgresStore, TenantStore};
use landlord_workflow::{InMemoryWorkflowProvider, WorkflowAction, WorkflowManager, WorkflowRegistry, WorkflowSpec};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::output;

// ── Run ───────────────────────────────────────────────────────────────────────

/// Starts the reconciliation controller and the HTTP API in-process, wired
/// to a single configured workflow/compute provider pair. Blocks until
/// ctrl-c, then cancels both and waits for them to drain.
pub async fn run(config_path: Option<PathBuf>) -> Result<()> {
    let config = match &config_path {
        Some(path) => landlord_config::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => landlord_config::load_from_env().context("failed to load config from environment")?,
    };

    let store: Arc<dyn TenantStore> = match &config.store {
        StoreBackend::Memory => {
            info!("using in-memory tenant store");
            Arc::new(InMemoryStore::new())
        }
        StoreBackend::Postgres { dsn } => {
            info!("connecting to postgres tenant store");
            Arc::new(
                PostgresStore::connect(dsn)
                    .await
                    .context("failed to connect to postgres store")?,
            )
        }
    };

    let compute = Arc::new(MockComputeProvider::new(config.compute_provider.clone()));
    let mut workflow_registry = WorkflowRegistry::new();
    workflow_registry
        .register(Arc::new(InMemoryWorkflowProvider::new(
            config.workflow_provider.clone(),
            compute,
        )))
        .context("failed to register workflow provider")?;
    let workflow = Arc::new(WorkflowManager::new(
        Arc::new(workflow_registry),
        config.workflow_provider.clone(),
    ));

    for action in [
        WorkflowAction::Provision,
        WorkflowAction::Update,
        WorkflowAction::Delete,
        WorkflowAction::Archive,
    ] {
        workflow
            .create_workflow(&WorkflowSpec {
                workflow_id: action.workflow_id(),
                name: action.to_string(),
                definition: b"noop".to_vec(),
                timeout: None,
            })
            .await
            .with_context(|| format!("failed to register workflow for action {action}"))?;
    }

    let controller = Controller::new(config.controller.clone(), store.clone(), workflow.clone());
    let shutdown = CancellationToken::new();

    let controller_task = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move { controller.run(shutdown).await })
    };

    let app = landlord_api::build_app(store, workflow);
    let listener = tokio::net::TcpListener::bind(&config.api_bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.api_bind_addr))?;
    info!(addr = %config.api_bind_addr, "landlord API listening");

    let api_task = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await
        })
    };

    tokio::signal::ctrl_c().await.context("failed to listen for ctrl-c")?;
    info!("shutdown signal received, draining controller and API server");
    shutdown.cancel();

    let _ = controller_task.await;
    api_task.await.context("API server task panicked")?.context("API server error")?;
    Ok(())
}

// ── Status ────────────────────────────────────────────────────────────────────

/// Fetches `GET /tenants` from a running landlord API server and prints a
/// summary table.
pub async fn status(api_url: String, status_filter: Option<String>, include_archived: bool) -> Result<()> {
    let mut url = format!("{}/tenants", api_url.trim_end_matches('/'));
    let mut query = Vec::new();
    if let Some(s) = &status_filter {
        query.push(format!("status={s}"));
    }
    if include_archived {
        query.push("include_archived=true".to_string());
    }
    if !query.is_empty() {
        url.push('?');
        url.push_str(&query.join("&"));
    }

    let tenants: Vec<serde_json::Value> = reqwest::Client::new()
        .get(&url)
        .send()
        .await
        .with_context(|| format!("failed to reach landlord API at {api_url}"))?
        .json()
        .await
        .context("failed to parse tenant list response")?;

    print!("{}", output::render_tenants_table(&tenants));
    Ok(())
}
