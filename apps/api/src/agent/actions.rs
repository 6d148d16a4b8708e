//! Action Dispatcher — translates one AI decision into task state writes.
//! This is a pure mapping; the decision itself comes from the LLM collaborator.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::task::EnergyLevel;
use crate::store::tasks::{self, NewTask};

const DEFAULT_FOLLOW_UP_MINUTES: i64 = 30;

/// Closed set of task-agent actions. Anything the AI returns outside this
/// set lands on `Unknown` and is handled as a no-op clarify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentAction {
    Create,
    Complete,
    Start,
    Delete,
    Snooze,
    Suggest,
    Clarify,
    #[serde(other)]
    #[default]
    Unknown,
}

impl AgentAction {
    /// True for actions that conclude the conversational turn with a state
    /// change; suggest/clarify/unknown keep the dialogue open.
    pub fn concludes_turn(&self) -> bool {
        matches!(
            self,
            AgentAction::Create
                | AgentAction::Complete
                | AgentAction::Start
                | AgentAction::Delete
                | AgentAction::Snooze
        )
    }
}

/// One task draft inside a `create` decision. Every field is optional; the
/// dispatcher fills defaults and clamps the ordinal scales.
#[derive(Debug, Default, Deserialize)]
pub struct TaskDraft {
    pub title: Option<String>,
    pub description: Option<String>,
    pub urgency: Option<i64>,
    pub importance: Option<i64>,
    pub estimated_minutes: Option<i32>,
    pub due_date: Option<String>,
    pub location: Option<String>,
    pub tags: Option<Vec<String>>,
    pub energy_level: Option<String>,
    pub can_be_split: Option<bool>,
    pub recurrence: Option<String>,
}

/// The AI's full decision for one agent turn.
#[derive(Debug, Default, Deserialize)]
pub struct AgentResponse {
    #[serde(default)]
    pub action: AgentAction,
    pub reply: Option<String>,
    #[serde(default)]
    pub replies: Vec<String>,
    pub tasks: Option<Vec<TaskDraft>>,
    /// Kept as a string: a malformed id from the AI degrades to a no-op
    /// instead of failing the whole parse.
    pub task_id: Option<String>,
    pub snoozed_until: Option<String>,
    pub follow_up_minutes: Option<i64>,
    #[allow(dead_code)]
    pub confidence: Option<f64>,
}

impl AgentResponse {
    pub fn task_uuid(&self) -> Option<Uuid> {
        self.task_id
            .as_deref()
            .and_then(|s| Uuid::parse_str(s).ok())
    }

    /// Replies to surface to the chat UI. Falls back to the singular `reply`
    /// field when the AI used that shape.
    pub fn reply_lines(&self) -> Vec<String> {
        if !self.replies.is_empty() {
            return self.replies.clone();
        }
        self.reply.clone().into_iter().collect()
    }
}

/// Clamps an AI-supplied ordinal to the 1-5 scale, defaulting to 3.
pub fn clamp_scale(value: Option<i64>) -> i32 {
    value.unwrap_or(3).clamp(1, 5) as i32
}

/// Lenient timestamp parsing for AI-supplied fields: RFC3339 first, then a
/// bare date (midnight UTC), then a naive datetime treated as UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.and_utc());
    }
    None
}

fn parse_energy(s: Option<&str>) -> EnergyLevel {
    match s {
        Some("low") => EnergyLevel::Low,
        Some("high") => EnergyLevel::High,
        Some("medium") | None => EnergyLevel::Medium,
        Some(other) => {
            warn!("Unrecognized energy_level '{other}', defaulting to medium");
            EnergyLevel::Medium
        }
    }
}

/// Applies the AI decision to the store and reports whether the turn
/// concluded an operation. Exactly one action per turn.
pub async fn apply_action(
    pool: &PgPool,
    user_id: Uuid,
    raw_input: &str,
    history: &[Value],
    response: &AgentResponse,
) -> Result<bool, AppError> {
    match response.action {
        AgentAction::Create => {
            let drafts = response.tasks.as_deref().unwrap_or_default();
            for draft in drafts {
                let task = NewTask {
                    user_id,
                    raw_input: raw_input.to_string(),
                    title: draft
                        .title
                        .clone()
                        .unwrap_or_else(|| raw_input.to_string()),
                    description: draft.description.clone(),
                    urgency: clamp_scale(draft.urgency),
                    importance: clamp_scale(draft.importance),
                    estimated_minutes: draft.estimated_minutes,
                    due_date: draft.due_date.as_deref().and_then(parse_timestamp),
                    location: draft.location.clone(),
                    tags: draft.tags.clone().unwrap_or_default(),
                    energy_level: parse_energy(draft.energy_level.as_deref()),
                    can_be_split: draft.can_be_split.unwrap_or(false),
                    recurrence: draft.recurrence.clone(),
                    ai_conversation: Value::Array(history.to_vec()),
                };
                tasks::insert_task(pool, task)
                    .await
                    .map_err(AppError::Internal)?;
            }
        }
        AgentAction::Complete => {
            if let Some(task_id) = response.task_uuid() {
                tasks::set_status(pool, task_id, crate::models::task::TaskStatus::Completed)
                    .await
                    .map_err(AppError::Internal)?;
            }
        }
        AgentAction::Start => {
            if let Some(task_id) = response.task_uuid() {
                let minutes = response
                    .follow_up_minutes
                    .unwrap_or(DEFAULT_FOLLOW_UP_MINUTES);
                let follow_up_at = Utc::now() + Duration::minutes(minutes);
                tasks::start_task(pool, task_id, follow_up_at)
                    .await
                    .map_err(AppError::Internal)?;
            }
        }
        AgentAction::Delete => {
            if let Some(task_id) = response.task_uuid() {
                tasks::set_status(pool, task_id, crate::models::task::TaskStatus::Deleted)
                    .await
                    .map_err(AppError::Internal)?;
            }
        }
        AgentAction::Snooze => {
            if let Some(task_id) = response.task_uuid() {
                // Stored verbatim when parseable; an unparseable timestamp
                // skips the write rather than failing the turn.
                match response.snoozed_until.as_deref().and_then(parse_timestamp) {
                    Some(until) => {
                        tasks::snooze_task(pool, task_id, until)
                            .await
                            .map_err(AppError::Internal)?;
                    }
                    None => warn!(
                        "Snooze for task {task_id} skipped: unparseable snoozed_until {:?}",
                        response.snoozed_until
                    ),
                }
            }
        }
        AgentAction::Suggest | AgentAction::Clarify => {}
        AgentAction::Unknown => {
            warn!("Unknown agent action, treating as clarify no-op");
        }
    }

    Ok(response.action.concludes_turn())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_scale_floor_and_ceiling() {
        assert_eq!(clamp_scale(Some(0)), 1);
        assert_eq!(clamp_scale(Some(99)), 5);
        assert_eq!(clamp_scale(Some(-3)), 1);
        assert_eq!(clamp_scale(Some(4)), 4);
    }

    #[test]
    fn test_clamp_scale_default() {
        assert_eq!(clamp_scale(None), 3);
    }

    #[test]
    fn test_unknown_action_falls_back() {
        let response: AgentResponse =
            serde_json::from_str(r#"{"action": "explode", "reply": "boom"}"#).unwrap();
        assert_eq!(response.action, AgentAction::Unknown);
        assert!(!response.action.concludes_turn());
    }

    #[test]
    fn test_done_flags_per_action() {
        for (action, done) in [
            (AgentAction::Create, true),
            (AgentAction::Complete, true),
            (AgentAction::Start, true),
            (AgentAction::Delete, true),
            (AgentAction::Snooze, true),
            (AgentAction::Suggest, false),
            (AgentAction::Clarify, false),
            (AgentAction::Unknown, false),
        ] {
            assert_eq!(action.concludes_turn(), done, "{action:?}");
        }
    }

    #[test]
    fn test_task_uuid_tolerates_garbage() {
        let response = AgentResponse {
            task_id: Some("not-a-uuid".to_string()),
            ..Default::default()
        };
        assert!(response.task_uuid().is_none());
    }

    #[test]
    fn test_parse_timestamp_rfc3339_and_date_only() {
        let full = parse_timestamp("2026-04-01T09:30:00Z").unwrap();
        assert_eq!(full.to_rfc3339(), "2026-04-01T09:30:00+00:00");

        let date_only = parse_timestamp("2026-04-01").unwrap();
        assert_eq!(date_only.to_rfc3339(), "2026-04-01T00:00:00+00:00");

        assert!(parse_timestamp("sometime soon").is_none());
    }

    #[test]
    fn test_reply_lines_fallback_to_singular() {
        let response: AgentResponse =
            serde_json::from_str(r#"{"action": "clarify", "reply": "Which task?"}"#).unwrap();
        assert_eq!(response.reply_lines(), vec!["Which task?".to_string()]);

        let multi: AgentResponse = serde_json::from_str(
            r#"{"action": "clarify", "reply": "ignored", "replies": ["a", "b"]}"#,
        )
        .unwrap();
        assert_eq!(multi.reply_lines(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_create_draft_deserializes_with_nulls() {
        let response: AgentResponse = serde_json::from_str(
            r#"{
                "action": "create",
                "reply": "Added!",
                "tasks": [{"title": "Buy milk", "urgency": 2, "due_date": null,
                           "energy_level": "low", "tags": ["errand"]}]
            }"#,
        )
        .unwrap();
        assert_eq!(response.action, AgentAction::Create);
        let draft = &response.tasks.as_ref().unwrap()[0];
        assert_eq!(draft.title.as_deref(), Some("Buy milk"));
        assert_eq!(clamp_scale(draft.urgency), 2);
        assert_eq!(parse_energy(draft.energy_level.as_deref()), EnergyLevel::Low);
    }
}
