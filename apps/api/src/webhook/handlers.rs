//! POST /api/telegram/webhook — always acknowledges with 200 `{ok:true}`
//! regardless of internal outcome, so the platform never enters a
//! redelivery storm.

use anyhow::Result;
use axum::{extract::State, Json};
use chrono::{DateTime, Duration, Local, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::models::nudge::{NudgeStatus, Sentiment};
use crate::state::AppState;
use crate::store::{nudges, users};
use crate::webhook::prompts::{sentiment_prompt, SENTIMENT_SYSTEM};

const SENTIMENT_MAX_TOKENS: u32 = 512;
/// Local hour until which "busy today" pauses nudges.
const BUSY_PAUSE_HOUR: u32 = 21;

const ACK_ON_IT: &str = "Awesome, you've got this! 💪";
const ACK_SNOOZE: &str = "No worries, I'll check back in an hour ⏰";
const ACK_BUSY: &str = "Got it! I'll leave you alone for the rest of today 😌";

#[derive(Debug, Deserialize)]
pub struct TelegramUpdate {
    pub callback_query: Option<CallbackQuery>,
    pub message: Option<IncomingMessage>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub data: Option<String>,
    pub message: Option<IncomingMessage>,
}

#[derive(Debug, Deserialize)]
pub struct IncomingMessage {
    pub text: Option<String>,
    pub chat: Chat,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
}

/// The fixed three-way button protocol plus the unrecognized fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    OnIt,
    Snooze1h,
    BusyToday,
    Unknown,
}

impl CallbackAction {
    fn parse(s: &str) -> Self {
        match s {
            "on_it" => CallbackAction::OnIt,
            "snooze_1h" => CallbackAction::Snooze1h,
            "busy_today" => CallbackAction::BusyToday,
            _ => CallbackAction::Unknown,
        }
    }
}

/// Splits "<action>:<nudge_id>" callback data. `None` for anything that
/// doesn't carry both halves.
fn parse_callback_data(data: &str) -> Option<(CallbackAction, Uuid)> {
    let (action, id) = data.split_once(':')?;
    let nudge_id = Uuid::parse_str(id).ok()?;
    Some((CallbackAction::parse(action), nudge_id))
}

/// 9pm today in local time, or 9pm tomorrow if already past it.
fn pause_until_9pm(now: DateTime<Local>) -> DateTime<Utc> {
    let mut nine_pm = now
        .date_naive()
        .and_hms_opt(BUSY_PAUSE_HOUR, 0, 0)
        .expect("static time is valid")
        .and_local_timezone(Local)
        .earliest()
        .unwrap_or(now);
    if nine_pm <= now {
        nine_pm += Duration::days(1);
    }
    nine_pm.with_timezone(&Utc)
}

/// The classified response from the sentiment collaborator. Everything but
/// the sentiment itself is optional: a missing ack must not lose the reply.
#[derive(Debug, Deserialize)]
struct SentimentAnalysis {
    sentiment: Sentiment,
    #[serde(default)]
    pause_hours: f64,
    #[serde(default)]
    brief_ack: String,
}

/// The body is taken raw and parsed leniently inside: even a syntactically
/// invalid payload must be answered with 200, so the typed `Json` extractor
/// (which rejects those with 400 before the handler runs) is not used here.
pub async fn handle_webhook(State(state): State<AppState>, body: String) -> Json<Value> {
    if let Err(e) = process_update(&state, &body).await {
        // Still acknowledge: a non-200 would make Telegram redeliver forever.
        error!("Error handling telegram update: {e:#}");
    }
    Json(json!({ "ok": true }))
}

async fn process_update(state: &AppState, raw: &str) -> Result<()> {
    let update: TelegramUpdate = match serde_json::from_str(raw) {
        Ok(update) => update,
        Err(e) => {
            warn!("Unparseable telegram update ignored: {e}");
            return Ok(());
        }
    };

    if let Some(callback) = update.callback_query {
        return handle_callback_query(state, callback).await;
    }

    if let Some(message) = update.message {
        if message.text.is_some() {
            return handle_text_message(state, message).await;
        }
    }

    // Other update kinds (edits, stickers, joins) are none of our business.
    Ok(())
}

/// Button press: fixed mapping to nudge status + sentiment, optional pause.
async fn handle_callback_query(state: &AppState, callback: CallbackQuery) -> Result<()> {
    let data = callback.data.as_deref().unwrap_or_default();
    let Some((action, nudge_id)) = parse_callback_data(data) else {
        warn!("Invalid callback_data format: {data}");
        return Ok(());
    };

    let chat_id = match &callback.message {
        Some(message) => message.chat.id.to_string(),
        None => {
            warn!("Callback query without originating message, ignoring");
            return Ok(());
        }
    };

    let (sentiment, status, pause_until, ack) = match action {
        CallbackAction::OnIt => (Sentiment::Positive, NudgeStatus::Accepted, None, ACK_ON_IT),
        CallbackAction::Snooze1h => (Sentiment::Neutral, NudgeStatus::Dismissed, None, ACK_SNOOZE),
        CallbackAction::BusyToday => (
            Sentiment::Busy,
            NudgeStatus::Dismissed,
            Some(pause_until_9pm(Local::now())),
            ACK_BUSY,
        ),
        CallbackAction::Unknown => {
            warn!("Unknown callback action in: {data}");
            return Ok(());
        }
    };

    nudges::record_button_response(&state.db, nudge_id, status, sentiment, Utc::now()).await?;

    if let Some(until) = pause_until {
        if let Some(user) = users::find_by_chat_id(&state.db, &chat_id).await? {
            users::set_nudge_paused_until(&state.db, user.id, until).await?;
            info!("User {} paused until {until}", user.id);
        }
    }

    state
        .telegram
        .answer_callback_query(&callback.id, None)
        .await?;
    state.telegram.send_message(&chat_id, ack, None).await?;

    Ok(())
}

/// Free-text reply: correlate to the latest unresponded nudge, classify the
/// sentiment, record it, and extend the pause when suggested.
async fn handle_text_message(state: &AppState, message: IncomingMessage) -> Result<()> {
    let chat_id = message.chat.id.to_string();
    let text = message.text.unwrap_or_default();

    let Some(user) = users::find_by_chat_id(&state.db, &chat_id).await? else {
        info!("No user found for chat_id {chat_id}, ignoring message");
        return Ok(());
    };

    let Some(nudge) = nudges::latest_unresponded_nudge(&state.db, user.id).await? else {
        info!("No unresponded nudge for user {}, ignoring message", user.id);
        return Ok(());
    };

    let analysis: SentimentAnalysis = state
        .llm
        .call_json(&sentiment_prompt(&text), SENTIMENT_SYSTEM, SENTIMENT_MAX_TOKENS)
        .await?;

    if analysis.sentiment == Sentiment::Unrecognized {
        warn!("Unrecognized sentiment from classifier, storing as neutral");
    }

    nudges::record_text_response(&state.db, nudge.id, &text, analysis.sentiment, Utc::now())
        .await?;

    if analysis.pause_hours > 0.0 {
        let until = Utc::now() + Duration::minutes((analysis.pause_hours * 60.0) as i64);
        users::set_nudge_paused_until(&state.db, user.id, until).await?;
        info!(
            "User {} paused for {} hours after reply",
            user.id, analysis.pause_hours
        );
    }

    if !analysis.brief_ack.is_empty() {
        state
            .telegram
            .send_message(&chat_id, &analysis.brief_ack, None)
            .await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use sqlx::PgPool;
    use std::sync::Arc;

    use crate::calendar::CalendarClient;
    use crate::config::Config;
    use crate::llm_client::LlmClient;
    use crate::nudge::matcher::LlmNudgeMatcher;
    use crate::telegram::TelegramClient;

    // Lazy pool and dummy tokens: the paths under test return before any
    // database or network call.
    fn dummy_state() -> AppState {
        let llm = LlmClient::new("test-key".to_string());
        AppState {
            db: PgPool::connect_lazy("postgres://localhost/unused").unwrap(),
            llm: llm.clone(),
            telegram: TelegramClient::new("test-token".to_string()),
            calendar: CalendarClient::new(None),
            matcher: Arc::new(LlmNudgeMatcher::new(llm)),
            config: Config {
                database_url: "postgres://localhost/unused".to_string(),
                anthropic_api_key: "test-key".to_string(),
                telegram_bot_token: "test-token".to_string(),
                google: None,
                cron_secret: None,
                port: 8080,
                rust_log: "info".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_still_acknowledged() {
        let response = handle_webhook(State(dummy_state()), "{not json".to_string()).await;
        assert_eq!(response.0["ok"], json!(true));
    }

    #[tokio::test]
    async fn test_unknown_update_kind_is_acknowledged() {
        let body = r#"{"edited_message": {"text": "typo fix"}}"#.to_string();
        let response = handle_webhook(State(dummy_state()), body).await;
        assert_eq!(response.0["ok"], json!(true));
    }

    #[test]
    fn test_parse_callback_data_roundtrip() {
        let id = Uuid::new_v4();
        let (action, nudge_id) = parse_callback_data(&format!("on_it:{id}")).unwrap();
        assert_eq!(action, CallbackAction::OnIt);
        assert_eq!(nudge_id, id);

        let (action, _) = parse_callback_data(&format!("busy_today:{id}")).unwrap();
        assert_eq!(action, CallbackAction::BusyToday);
    }

    #[test]
    fn test_parse_callback_data_rejects_malformed() {
        assert!(parse_callback_data("no-colon-here").is_none());
        assert!(parse_callback_data("on_it:not-a-uuid").is_none());
    }

    #[test]
    fn test_unknown_callback_action_maps_to_fallback() {
        let id = Uuid::new_v4();
        let (action, _) = parse_callback_data(&format!("self_destruct:{id}")).unwrap();
        assert_eq!(action, CallbackAction::Unknown);
    }

    #[test]
    fn test_pause_until_9pm_before_9pm_is_today() {
        let afternoon = Local.with_ymd_and_hms(2026, 3, 2, 14, 0, 0).unwrap();
        let until = pause_until_9pm(afternoon).with_timezone(&Local);
        assert_eq!(until.date_naive(), afternoon.date_naive());
        assert_eq!(until.time().format("%H:%M").to_string(), "21:00");
    }

    #[test]
    fn test_pause_until_9pm_after_9pm_is_tomorrow() {
        let late = Local.with_ymd_and_hms(2026, 3, 2, 22, 30, 0).unwrap();
        let until = pause_until_9pm(late).with_timezone(&Local);
        assert_eq!(
            until.date_naive(),
            afternoon_of_next_day(late)
        );
        assert_eq!(until.time().format("%H:%M").to_string(), "21:00");
    }

    fn afternoon_of_next_day(dt: DateTime<Local>) -> chrono::NaiveDate {
        (dt + Duration::days(1)).date_naive()
    }

    #[test]
    fn test_pause_exactly_at_9pm_rolls_to_tomorrow() {
        let at_nine = Local.with_ymd_and_hms(2026, 3, 2, 21, 0, 0).unwrap();
        let until = pause_until_9pm(at_nine).with_timezone(&Local);
        assert!(until > at_nine);
    }

    #[test]
    fn test_sentiment_analysis_parses_with_unrecognized_fallback() {
        let a: SentimentAnalysis = serde_json::from_str(
            r#"{"sentiment": "ecstatic", "pause_hours": 0, "brief_ack": "ok!"}"#,
        )
        .unwrap();
        assert_eq!(a.sentiment, Sentiment::Unrecognized);

        let b: SentimentAnalysis =
            serde_json::from_str(r#"{"sentiment": "busy", "pause_hours": 4, "brief_ack": "ok"}"#)
                .unwrap();
        assert_eq!(b.sentiment, Sentiment::Busy);
        assert_eq!(b.pause_hours, 4.0);
    }

    #[test]
    fn test_sentiment_without_ack_still_parses() {
        let a: SentimentAnalysis =
            serde_json::from_str(r#"{"sentiment": "positive"}"#).unwrap();
        assert_eq!(a.sentiment, Sentiment::Positive);
        assert!(a.brief_ack.is_empty());
        assert_eq!(a.pause_hours, 0.0);
    }
}
