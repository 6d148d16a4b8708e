//! Nudge Eligibility Gate — the ordered, short-circuiting policy deciding
//! whether a single user may be nudged on a single scheduler tick.
//!
//! The gate is a pure function of the user record and the day's nudge
//! history; the calendar/task/AI steps that follow a `Proceed` are
//! orchestrated by the cron handler. Because a `Skip` is returned before any
//! of those steps, a paused or capped user costs zero external calls.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use crate::models::nudge::{NudgeRow, Sentiment};
use crate::models::user::UserRow;
use crate::nudge::{COOLDOWN_MINUTES, MAX_UNANSWERED_PER_DAY};

/// Contextual signal handed to the AI matcher so it can phrase the nudge.
/// Computed per tick, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct NudgeContext {
    pub todays_nudge_count: usize,
    pub unanswered_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_nudge_minutes_ago: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sentiment: Option<Sentiment>,
    pub can_send_more: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    Paused { until: DateTime<Utc> },
    UnansweredCap { unanswered: usize },
    Cooldown { minutes_since_last: i64 },
    LastReplyBusy,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Paused { until } => write!(f, "nudges paused until {until}"),
            SkipReason::UnansweredCap { unanswered } => {
                write!(f, "too many unanswered nudges ({unanswered})")
            }
            SkipReason::Cooldown { minutes_since_last } => {
                write!(f, "too soon after last nudge ({minutes_since_last}m)")
            }
            SkipReason::LastReplyBusy => write!(f, "last reply sentiment was busy"),
        }
    }
}

#[derive(Debug)]
pub enum GateDecision {
    Proceed(NudgeContext),
    Skip(SkipReason),
}

/// Evaluates the gate for one user. `todays_nudges` must be the user's
/// nudges since local midnight ordered most-recent-first (the store's
/// `todays_nudges` contract).
pub fn evaluate(
    user: &UserRow,
    todays_nudges: &[NudgeRow],
    now: DateTime<Utc>,
) -> GateDecision {
    // 1. Explicit pause wins over everything.
    if let Some(until) = user.nudge_paused_until {
        if until > now {
            return GateDecision::Skip(SkipReason::Paused { until });
        }
    }

    // 2. Hard daily cap on unacknowledged reminders.
    let unanswered = todays_nudges.iter().filter(|n| n.is_unanswered()).count();
    if unanswered >= MAX_UNANSWERED_PER_DAY {
        return GateDecision::Skip(SkipReason::UnansweredCap { unanswered });
    }

    // 3. One outstanding nudge: require the cooldown since the most recent.
    let last = todays_nudges.first();
    let last_nudge_minutes_ago = last.map(|n| (now - n.created_at).num_minutes());
    if unanswered == 1 {
        if let Some(minutes_since_last) = last_nudge_minutes_ago {
            if minutes_since_last < COOLDOWN_MINUTES {
                return GateDecision::Skip(SkipReason::Cooldown { minutes_since_last });
            }
        }
    }

    // 4. An explicit "busy" reply overrides timing for the rest of the day.
    if last.and_then(|n| n.sentiment()) == Some(Sentiment::Busy) {
        return GateDecision::Skip(SkipReason::LastReplyBusy);
    }

    GateDecision::Proceed(NudgeContext {
        todays_nudge_count: todays_nudges.len(),
        unanswered_count: unanswered,
        last_nudge_minutes_ago,
        last_sentiment: last.and_then(|n| n.sentiment()),
        can_send_more: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use serde_json::Value;
    use uuid::Uuid;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 14, 0, 0).unwrap()
    }

    fn user(paused_until: Option<DateTime<Utc>>) -> UserRow {
        UserRow {
            id: Uuid::new_v4(),
            display_name: "Test".to_string(),
            email: None,
            telegram_chat_id: Some("12345".to_string()),
            timezone: "UTC".to_string(),
            nudge_paused_until: paused_until,
            created_at: now() - Duration::days(30),
            updated_at: now(),
        }
    }

    fn nudge(
        minutes_ago: i64,
        responded: bool,
        sentiment: Option<&str>,
    ) -> NudgeRow {
        let created_at = now() - Duration::minutes(minutes_ago);
        NudgeRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            task_id: Uuid::new_v4(),
            channel: "telegram".to_string(),
            message_text: "How about that task?".to_string(),
            calendar_slot: None::<Value>,
            status: if responded { "dismissed" } else { "sent" }.to_string(),
            responded_at: responded.then(|| created_at + Duration::minutes(5)),
            response_text: None,
            ai_sentiment: sentiment.map(String::from),
            telegram_msg_id: Some("99".to_string()),
            created_at,
            updated_at: created_at,
        }
    }

    #[test]
    fn test_paused_user_is_skipped_before_anything_else() {
        let decision = evaluate(&user(Some(now() + Duration::hours(3))), &[], now());
        assert!(matches!(
            decision,
            GateDecision::Skip(SkipReason::Paused { .. })
        ));
    }

    #[test]
    fn test_expired_pause_does_not_skip() {
        let decision = evaluate(&user(Some(now() - Duration::hours(1))), &[], now());
        assert!(matches!(decision, GateDecision::Proceed(_)));
    }

    #[test]
    fn test_two_unanswered_nudges_hit_the_cap() {
        let nudges = vec![nudge(30, false, None), nudge(200, false, None)];
        let decision = evaluate(&user(None), &nudges, now());
        assert!(matches!(
            decision,
            GateDecision::Skip(SkipReason::UnansweredCap { unanswered: 2 })
        ));
    }

    #[test]
    fn test_one_unanswered_within_cooldown_is_skipped() {
        let nudges = vec![nudge(45, false, None)];
        let decision = evaluate(&user(None), &nudges, now());
        assert!(matches!(
            decision,
            GateDecision::Skip(SkipReason::Cooldown {
                minutes_since_last: 45
            })
        ));
    }

    #[test]
    fn test_one_unanswered_past_cooldown_proceeds() {
        let nudges = vec![nudge(90, false, None)];
        match evaluate(&user(None), &nudges, now()) {
            GateDecision::Proceed(ctx) => {
                assert_eq!(ctx.todays_nudge_count, 1);
                assert_eq!(ctx.unanswered_count, 1);
                assert_eq!(ctx.last_nudge_minutes_ago, Some(90));
                assert!(ctx.can_send_more);
            }
            other => panic!("expected Proceed, got {other:?}"),
        }
    }

    #[test]
    fn test_busy_reply_skips_even_when_answered() {
        let nudges = vec![nudge(120, true, Some("busy"))];
        let decision = evaluate(&user(None), &nudges, now());
        assert!(matches!(
            decision,
            GateDecision::Skip(SkipReason::LastReplyBusy)
        ));
    }

    #[test]
    fn test_non_busy_sentiment_proceeds_with_context() {
        let nudges = vec![nudge(120, true, Some("positive"))];
        match evaluate(&user(None), &nudges, now()) {
            GateDecision::Proceed(ctx) => {
                assert_eq!(ctx.unanswered_count, 0);
                assert_eq!(ctx.last_sentiment, Some(Sentiment::Positive));
            }
            other => panic!("expected Proceed, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_history_proceeds_with_zeroed_context() {
        match evaluate(&user(None), &[], now()) {
            GateDecision::Proceed(ctx) => {
                assert_eq!(ctx.todays_nudge_count, 0);
                assert_eq!(ctx.unanswered_count, 0);
                assert_eq!(ctx.last_nudge_minutes_ago, None);
                assert_eq!(ctx.last_sentiment, None);
            }
            other => panic!("expected Proceed, got {other:?}"),
        }
    }

    #[test]
    fn test_unrecognized_stored_sentiment_is_ignored() {
        let nudges = vec![nudge(120, true, Some("confused"))];
        match evaluate(&user(None), &nudges, now()) {
            GateDecision::Proceed(ctx) => assert_eq!(ctx.last_sentiment, None),
            other => panic!("expected Proceed, got {other:?}"),
        }
    }
}
