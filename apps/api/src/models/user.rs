use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub display_name: String,
    pub email: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub timezone: String,
    /// Nudges must never be sent while now < nudge_paused_until.
    pub nudge_paused_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
