use axum::{
    routing::{delete, get, post},
    Router,
};
use qflow_core::QflowConfig;
use qflow_scheduler::Scheduler;
use std::sync::Arc;

/// Central shared state — passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub config: QflowConfig,
    pub scheduler: Scheduler,
}

impl AppState {
    pub fn new(config: QflowConfig, scheduler: Scheduler) -> Self {
        Self { config, scheduler }
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route("/api/jobs", get(crate::http::jobs::list_jobs))
        .route("/api/jobs/schedule", post(crate::http::jobs::schedule_job))
        .route(
            "/api/jobs/cancel/{job_name}",
            delete(crate::http::jobs::cancel_job),
        )
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
