//! API routes.

use axum::middleware;
use axum::routing::{delete, get, post, put};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::health::health;
use crate::handlers::jobs::{
    create_job, delete_job, get_job, list_jobs, list_jobs_by_employer, update_job,
};
use crate::handlers::session::{login, logout};
use crate::handlers::tasks::{accept_job, delete_task, list_tasks_by_taker};
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, request_id, request_logging, security_headers};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let session_routes = Router::new()
        .route("/jwt", post(login))
        .route("/logout", post(logout));

    let job_routes = Router::new()
        // Public listing
        .route("/jobs", get(list_jobs))
        .route("/jobs", post(create_job))
        .route("/job/:id", get(get_job))
        .route("/job/:id", put(update_job))
        .route("/job/:id", delete(delete_job))
        // Employer-scoped listing
        .route("/jobs/employer/:email", get(list_jobs_by_employer));

    let task_routes = Router::new()
        .route("/accepted-tasks", post(accept_job))
        .route("/accepted-tasks/:id", delete(delete_task))
        .route("/accepted-tasks/taker/:email", get(list_tasks_by_taker));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health));

    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .merge(session_routes)
        .merge(job_routes)
        .merge(task_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
