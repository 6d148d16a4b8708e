// Nudge-match LLM prompt. The task list is projected down to the fields the
// matcher needs — full rows would waste tokens on conversation traces.

use serde_json::json;

use crate::calendar::slots::CalendarSlot;
use crate::models::task::TaskRow;
use crate::nudge::eligibility::NudgeContext;

pub const NUDGE_MATCH_SYSTEM: &str = "\
You are a productivity assistant. Given a user's free calendar slots and \
their active tasks, pick the single best task to suggest for the nearest \
free slot. You MUST respond with valid JSON only — no markdown fences.";

const NUDGE_MATCH_TEMPLATE: &str = r#"Free slots:
{free_slots}

Active tasks:
{tasks}

Nudge context for today:
{nudge_context}

Rules:
- Use Eisenhower matrix: urgent+important first, then important, then urgent
- Prefer tasks with approaching due dates
- Match task estimated_minutes to slot duration when possible
- Consider energy_level vs time of day
- Don't suggest tasks that depend on incomplete tasks
- If no good match, pick the highest urgency+importance task

Tone rules based on nudge context:
- If todays_nudge_count is 0: be warm and encouraging (e.g. "Good morning! How about...")
- If unanswered_count is 1: be gentler and less pushy, acknowledge they might be busy
- If a last nudge exists: vary your messaging style from the previous nudge message
- Always keep it friendly and brief (1-2 sentences)

Return ONLY valid JSON:
{
  "task_id": "<uuid>",
  "task_title": "<title>",
  "slot": { "start": "<iso>", "end": "<iso>" },
  "message": "<friendly 1-2 sentence nudge message for Telegram>"
}

JSON only, no markdown fences:"#;

pub fn nudge_match_prompt(
    free_slots: &[CalendarSlot],
    tasks: &[TaskRow],
    context: &NudgeContext,
) -> String {
    let compact_tasks: Vec<_> = tasks
        .iter()
        .map(|t| {
            json!({
                "id": t.id,
                "title": t.title,
                "urgency": t.urgency,
                "importance": t.importance,
                "due_date": t.due_date,
                "estimated_minutes": t.estimated_minutes,
                "location": t.location,
                "energy_level": t.energy_level,
                "depends_on": t.depends_on,
            })
        })
        .collect();

    NUDGE_MATCH_TEMPLATE
        .replace(
            "{free_slots}",
            &serde_json::to_string(free_slots).unwrap_or_else(|_| "[]".to_string()),
        )
        .replace(
            "{tasks}",
            &serde_json::to_string(&compact_tasks).unwrap_or_else(|_| "[]".to_string()),
        )
        .replace(
            "{nudge_context}",
            &serde_json::to_string(context).unwrap_or_else(|_| "{}".to_string()),
        )
}
