//! The periodic nudge job: GET /api/cron/nudge, triggered by an external
//! scheduler. Users are processed strictly sequentially; one user's failure
//! is recorded and never aborts the rest of the tick.

use anyhow::{anyhow, Result};
use axum::{extract::State, http::HeaderMap, Json};
use chrono::{Duration, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::calendar::slots::find_free_slots;
use crate::errors::AppError;
use crate::models::user::UserRow;
use crate::nudge::eligibility::{evaluate, GateDecision};
use crate::nudge::{MIN_SLOT_MINUTES, NUDGE_WINDOW_HOURS};
use crate::state::AppState;
use crate::store::{nudges, tasks, users};

#[derive(Debug, Serialize)]
pub struct CronNudgeResponse {
    pub nudges_sent: u32,
    pub users_processed: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

/// GET /api/cron/nudge
///
/// Evaluates every nudge-eligible user and sends at most one nudge each.
/// Optionally guarded by a bearer token when CRON_SECRET is configured.
pub async fn handle_cron_nudge(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<CronNudgeResponse>, AppError> {
    if let Some(secret) = &state.config.cron_secret {
        let expected = format!("Bearer {secret}");
        let provided = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if provided != expected {
            return Err(AppError::Unauthorized);
        }
    }

    let recipients = users::nudge_recipients(&state.db)
        .await
        .map_err(AppError::Internal)?;

    let mut nudges_sent = 0u32;
    let mut users_processed = 0u32;
    let mut errors: Vec<String> = Vec::new();

    for user in &recipients {
        users_processed += 1;
        match nudge_one_user(&state, user).await {
            Ok(true) => nudges_sent += 1,
            Ok(false) => {}
            Err(e) => {
                warn!("Error processing user {}: {e:#}", user.id);
                errors.push(format!("User {}: {e:#}", user.id));
            }
        }
    }

    info!(nudges_sent, users_processed, "Nudge tick finished");

    Ok(Json(CronNudgeResponse {
        nudges_sent,
        users_processed,
        errors: (!errors.is_empty()).then_some(errors),
    }))
}

/// Full per-user pipeline: eligibility gate → free slots → active tasks →
/// AI match → persist + deliver. Returns whether a nudge went out.
async fn nudge_one_user(state: &AppState, user: &UserRow) -> Result<bool> {
    let now = Utc::now();

    let todays = nudges::todays_nudges(&state.db, user.id).await?;
    let context = match evaluate(user, &todays, now) {
        GateDecision::Skip(reason) => {
            info!("User {}: {reason}", user.id);
            return Ok(false);
        }
        GateDecision::Proceed(context) => context,
    };

    // Calendar failures downgrade to an open window, not an aborted user.
    let busy = match state.calendar.free_busy(NUDGE_WINDOW_HOURS).await {
        Ok(busy) => busy,
        Err(e) => {
            warn!("User {}: free/busy fetch failed, assuming open: {e}", user.id);
            Vec::new()
        }
    };

    let window_end = now + Duration::hours(NUDGE_WINDOW_HOURS);
    let free_slots = find_free_slots(&busy, now, window_end, MIN_SLOT_MINUTES);
    if free_slots.is_empty() {
        info!("User {}: no free slots", user.id);
        return Ok(false);
    }

    let active_tasks = tasks::active_tasks(&state.db, user.id).await?;
    if active_tasks.is_empty() {
        info!("User {}: no active tasks", user.id);
        return Ok(false);
    }

    let matched = state
        .matcher
        .match_task(&free_slots, &active_tasks, &context)
        .await?;

    let (task_id, message) = match (matched.task_uuid(), matched.message.as_deref()) {
        (Some(task_id), Some(message)) if !message.is_empty() => (task_id, message.to_string()),
        // No task or no message is "no good match", not an error.
        _ => {
            info!("User {}: AI couldn't match a task", user.id);
            return Ok(false);
        }
    };

    let chat_id = user
        .telegram_chat_id
        .as_deref()
        .ok_or_else(|| anyhow!("user has no telegram chat id"))?;

    let calendar_slot = matched
        .slot
        .as_ref()
        .and_then(|s| serde_json::to_value(s).ok());

    let nudge = nudges::insert_nudge(
        &state.db,
        nudges::NewNudge {
            user_id: user.id,
            task_id,
            message_text: message.clone(),
            calendar_slot,
        },
    )
    .await?;

    let telegram_msg_id = state.telegram.send_nudge(chat_id, nudge.id, &message).await?;
    nudges::set_telegram_msg_id(&state.db, nudge.id, &telegram_msg_id).await?;

    info!("Sent nudge to user {}: {message}", user.id);
    Ok(true)
}
