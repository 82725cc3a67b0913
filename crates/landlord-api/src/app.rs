use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use landlord_store::TenantStore;
use landlord_workflow::WorkflowManager;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

pub fn build_app(store: Arc<dyn TenantStore>, workflow: Arc<WorkflowManager>) -> Router {
    let state = AppState { store, workflow };

    Router::new()
        .route("/health", get(handlers::health))
        .route("/ready", get(handlers::ready))
        .route("/tenants", get(handlers::list_tenants).post(handlers::create_tenant))
        .route(
            "/tenants/:id",
            get(handlers::get_tenant)
                .put(handlers::update_tenant)
                .delete(handlers::delete_tenant),
        )
        .route("/tenants/:id/archive", post(handlers::archive_tenant))
        .route("/tenants/:id/history", get(handlers::get_tenant_history))
        .route("/tenants/by-name/:name", get(handlers::get_tenant_by_name))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
