pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::agent::handlers as agent_handlers;
use crate::nudge::handlers as nudge_handlers;
use crate::state::AppState;
use crate::webhook::handlers as webhook_handlers;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Chat-driven task agent
        .route("/api/task-agent", post(agent_handlers::handle_task_agent))
        .route("/api/list-tasks", post(agent_handlers::handle_list_tasks))
        .route("/api/update-task", post(agent_handlers::handle_update_task))
        // Inbound Telegram updates
        .route(
            "/api/telegram/webhook",
            post(webhook_handlers::handle_webhook),
        )
        // Periodic nudge job, triggered by an external scheduler
        .route("/api/cron/nudge", get(nudge_handlers::handle_cron_nudge))
        .with_state(state)
}
