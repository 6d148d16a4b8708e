//! Task-to-slot matching — the AI decision behind each nudge, behind a trait
//! so the cron pipeline can be exercised with a fake matcher.

use async_trait::async_trait;
use serde::Deserialize;
use uuid::Uuid;

use crate::calendar::slots::CalendarSlot;
use crate::llm_client::{LlmClient, LlmError};
use crate::models::task::TaskRow;
use crate::nudge::eligibility::NudgeContext;
use crate::nudge::prompts::{nudge_match_prompt, NUDGE_MATCH_SYSTEM};

const MATCH_MAX_TOKENS: u32 = 1024;

/// The AI's match decision. A result lacking both a task reference and a
/// message means "no good match" — a normal skip, not an error.
#[derive(Debug, Default, Deserialize)]
pub struct NudgeMatch {
    /// Kept as a string: a malformed id degrades to "no match".
    pub task_id: Option<String>,
    #[allow(dead_code)]
    pub task_title: Option<String>,
    pub slot: Option<CalendarSlot>,
    pub message: Option<String>,
    #[allow(dead_code)]
    pub reason: Option<String>,
}

impl NudgeMatch {
    pub fn task_uuid(&self) -> Option<Uuid> {
        self.task_id
            .as_deref()
            .and_then(|s| Uuid::parse_str(s).ok())
    }
}

#[async_trait]
pub trait NudgeMatcher: Send + Sync {
    async fn match_task(
        &self,
        free_slots: &[CalendarSlot],
        tasks: &[TaskRow],
        context: &NudgeContext,
    ) -> Result<NudgeMatch, LlmError>;
}

/// Production matcher backed by the LLM client.
pub struct LlmNudgeMatcher {
    llm: LlmClient,
}

impl LlmNudgeMatcher {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl NudgeMatcher for LlmNudgeMatcher {
    async fn match_task(
        &self,
        free_slots: &[CalendarSlot],
        tasks: &[TaskRow],
        context: &NudgeContext,
    ) -> Result<NudgeMatch, LlmError> {
        let prompt = nudge_match_prompt(free_slots, tasks, context);
        self.llm
            .call_json(&prompt, NUDGE_MATCH_SYSTEM, MATCH_MAX_TOKENS)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_match_result_parses_to_empty() {
        let m: NudgeMatch = serde_json::from_str(
            r#"{"task_id": null, "slot": null, "message": null, "reason": "nothing fits"}"#,
        )
        .unwrap();
        assert!(m.task_uuid().is_none());
        assert!(m.message.is_none());
    }

    #[test]
    fn test_malformed_task_id_degrades_to_no_match() {
        let m: NudgeMatch =
            serde_json::from_str(r#"{"task_id": "oops", "message": "do it"}"#).unwrap();
        assert!(m.task_uuid().is_none());
    }

    #[test]
    fn test_full_match_parses() {
        let id = Uuid::new_v4();
        let json = format!(
            r#"{{"task_id": "{id}", "task_title": "Write report",
                "slot": {{"start": "2026-03-02T14:00:00Z", "end": "2026-03-02T15:00:00Z"}},
                "message": "Got an hour free — perfect for the report?"}}"#
        );
        let m: NudgeMatch = serde_json::from_str(&json).unwrap();
        assert_eq!(m.task_uuid(), Some(id));
        assert!(m.slot.is_some());
        assert!(m.message.is_some());
    }
}
