//! Axum route handlers for the task agent and the task CRUD surface.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::agent::actions::{apply_action, AgentResponse};
use crate::agent::prompts::{task_agent_prompt, TASK_AGENT_SYSTEM};
use crate::errors::AppError;
use crate::models::task::{TaskRow, TaskStatus};
use crate::state::AppState;
use crate::store::tasks::{self, TaskPatch};
use crate::timectx::TimeContext;

const AGENT_MAX_TOKENS: u32 = 4096;
const CALENDAR_LOOKAHEAD_DAYS: i64 = 60;
/// The chat UI always gets a reply, even when the turn blew up internally.
const FALLBACK_REPLY: &str = "I'm having trouble processing that right now. Could you try again?";

#[derive(Debug, Deserialize)]
pub struct TaskAgentRequest {
    pub user_id: Option<Uuid>,
    pub message: Option<String>,
    #[serde(default)]
    pub history: Vec<Value>,
    #[serde(default = "default_mode")]
    pub mode: String,
}

fn default_mode() -> String {
    "chat".to_string()
}

#[derive(Debug, Serialize)]
pub struct TaskAgentApiResponse {
    pub replies: Vec<String>,
    pub done: bool,
}

/// POST /api/task-agent
///
/// One conversational turn: fetch context, ask the AI for a decision,
/// dispatch it. Internal failures map to a 500 carrying an apology reply —
/// never a bare error to the chat UI.
pub async fn handle_task_agent(
    State(state): State<AppState>,
    Json(request): Json<TaskAgentRequest>,
) -> Response {
    let (user_id, message) = match (request.user_id, request.message.as_deref()) {
        (Some(user_id), Some(message)) if !message.is_empty() => (user_id, message.to_string()),
        _ => {
            return AppError::Validation(
                "Missing required fields: user_id, message".to_string(),
            )
            .into_response()
        }
    };

    match run_agent_turn(&state, user_id, &message, &request.history, &request.mode).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => {
            error!("task-agent turn failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(TaskAgentApiResponse {
                    replies: vec![FALLBACK_REPLY.to_string()],
                    done: false,
                }),
            )
                .into_response()
        }
    }
}

async fn run_agent_turn(
    state: &AppState,
    user_id: Uuid,
    message: &str,
    history: &[Value],
    mode: &str,
) -> Result<TaskAgentApiResponse, AppError> {
    let active_tasks = tasks::active_tasks(&state.db, user_id)
        .await
        .map_err(AppError::Internal)?;

    // Calendar data is advisory: degrade to no events rather than fail the turn.
    let calendar_events = match state.calendar.upcoming_events(CALENDAR_LOOKAHEAD_DAYS).await {
        Ok(events) => events,
        Err(e) => {
            warn!("Calendar fetch failed, continuing without: {e}");
            Vec::new()
        }
    };

    let time_context = TimeContext::now();
    let prompt = task_agent_prompt(
        mode,
        history,
        message,
        &active_tasks,
        &calendar_events,
        &time_context,
    );

    let decision: AgentResponse = state
        .llm
        .call_json(&prompt, TASK_AGENT_SYSTEM, AGENT_MAX_TOKENS)
        .await
        .map_err(|e| AppError::Llm(e.to_string()))?;

    info!(%user_id, action = ?decision.action, "Agent decision");

    let done = apply_action(&state.db, user_id, message, history, &decision).await?;

    Ok(TaskAgentApiResponse {
        replies: decision.reply_lines(),
        done,
    })
}

#[derive(Debug, Deserialize)]
pub struct ListTasksRequest {
    pub user_id: Option<Uuid>,
    pub status: Option<String>,
}

/// POST /api/list-tasks
///
/// Flat array of the user's tasks in one status, excluding snoozed ones.
pub async fn handle_list_tasks(
    State(state): State<AppState>,
    Json(request): Json<ListTasksRequest>,
) -> Result<Json<Vec<TaskRow>>, AppError> {
    let (user_id, status) = match (request.user_id, request.status.as_deref()) {
        (Some(user_id), Some(status)) => (user_id, status),
        _ => {
            return Err(AppError::Validation(
                "Missing required fields: user_id, status".to_string(),
            ))
        }
    };

    let status = TaskStatus::parse(status)
        .ok_or_else(|| AppError::Validation(format!("Unknown task status '{status}'")))?;

    let rows = tasks::tasks_by_status(&state.db, user_id, status)
        .await
        .map_err(AppError::Internal)?;
    Ok(Json(rows))
}

#[derive(Debug, Deserialize)]
pub struct UpdateTaskRequest {
    pub task_id: Option<Uuid>,
    pub fields: Option<TaskPatch>,
}

/// POST /api/update-task
///
/// Directly updates one or more fields on a task. Used by the task detail
/// screen for inline editing and status changes.
pub async fn handle_update_task(
    State(state): State<AppState>,
    Json(request): Json<UpdateTaskRequest>,
) -> Result<Json<TaskRow>, AppError> {
    let (task_id, fields) = match (request.task_id, request.fields) {
        (Some(task_id), Some(fields)) => (task_id, fields),
        _ => {
            return Err(AppError::Validation(
                "Missing required fields: task_id, fields".to_string(),
            ))
        }
    };

    let row = tasks::patch_task(&state.db, task_id, &fields).await?;
    Ok(Json(row))
}
