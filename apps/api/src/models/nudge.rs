use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NudgeStatus {
    Sent,
    Accepted,
    Dismissed,
    Expired,
}

impl NudgeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NudgeStatus::Sent => "sent",
            NudgeStatus::Accepted => "accepted",
            NudgeStatus::Dismissed => "dismissed",
            NudgeStatus::Expired => "expired",
        }
    }
}

/// Coarse classification of a user's reply to a nudge. `Unrecognized` is the
/// fallback for anything the AI collaborator returns outside the closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Neutral,
    Busy,
    Dismissive,
    #[serde(other)]
    Unrecognized,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Busy => "busy",
            Sentiment::Dismissive => "dismissive",
            // Stored as neutral; the call site logs the raw value.
            Sentiment::Unrecognized => "neutral",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "positive" => Some(Sentiment::Positive),
            "neutral" => Some(Sentiment::Neutral),
            "busy" => Some(Sentiment::Busy),
            "dismissive" => Some(Sentiment::Dismissive),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct NudgeRow {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Weak reference — lookup only, no ownership.
    pub task_id: Uuid,
    pub channel: String,
    pub message_text: String,
    /// The free slot the nudge was matched to, kept for traceability.
    pub calendar_slot: Option<Value>,
    pub status: String,
    pub responded_at: Option<DateTime<Utc>>,
    pub response_text: Option<String>,
    pub ai_sentiment: Option<String>,
    /// Telegram message id, used to correlate future replies.
    pub telegram_msg_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NudgeRow {
    /// A nudge is unanswered while it is still in `sent` with no reply recorded.
    pub fn is_unanswered(&self) -> bool {
        self.status == NudgeStatus::Sent.as_str() && self.responded_at.is_none()
    }

    pub fn sentiment(&self) -> Option<Sentiment> {
        self.ai_sentiment.as_deref().and_then(Sentiment::parse)
    }
}
