use anyhow::Result;
use chrono::{DateTime, Duration, Local, NaiveTime, TimeZone, Utc};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::nudge::{NudgeRow, NudgeStatus, Sentiment};

/// All nudges created for a user since local midnight, newest first.
/// This ordering is what the eligibility gate's cooldown check relies on.
pub async fn todays_nudges(pool: &PgPool, user_id: Uuid) -> Result<Vec<NudgeRow>> {
    let nudges = sqlx::query_as::<_, NudgeRow>(
        "SELECT * FROM nudges WHERE user_id = $1 AND created_at >= $2 \
         ORDER BY created_at DESC",
    )
    .bind(user_id)
    .bind(local_midnight())
    .fetch_all(pool)
    .await?;
    Ok(nudges)
}

/// Midnight of the current day in server-local time, as a UTC instant.
fn local_midnight() -> DateTime<Utc> {
    let today = Local::now().date_naive();
    Local
        .from_local_datetime(&today.and_time(NaiveTime::MIN))
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        // A nonexistent local midnight (DST edge) falls back to a 24h window.
        .unwrap_or_else(|| Utc::now() - Duration::hours(24))
}

#[derive(Debug)]
pub struct NewNudge {
    pub user_id: Uuid,
    pub task_id: Uuid,
    pub message_text: String,
    pub calendar_slot: Option<Value>,
}

/// Inserts a nudge in `sent` status on the telegram channel.
pub async fn insert_nudge(pool: &PgPool, nudge: NewNudge) -> Result<NudgeRow> {
    let row = sqlx::query_as::<_, NudgeRow>(
        r#"
        INSERT INTO nudges (user_id, task_id, channel, message_text, calendar_slot, status)
        VALUES ($1, $2, 'telegram', $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(nudge.user_id)
    .bind(nudge.task_id)
    .bind(&nudge.message_text)
    .bind(&nudge.calendar_slot)
    .bind(NudgeStatus::Sent.as_str())
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Patches the delivered message id onto the nudge for reply correlation.
pub async fn set_telegram_msg_id(pool: &PgPool, nudge_id: Uuid, msg_id: &str) -> Result<()> {
    sqlx::query("UPDATE nudges SET telegram_msg_id = $1, updated_at = now() WHERE id = $2")
        .bind(msg_id)
        .bind(nudge_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Records a button-press response: mapped status + sentiment, responded_at.
pub async fn record_button_response(
    pool: &PgPool,
    nudge_id: Uuid,
    status: NudgeStatus,
    sentiment: Sentiment,
    responded_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        "UPDATE nudges SET status = $1, ai_sentiment = $2, responded_at = $3, \
         updated_at = now() WHERE id = $4",
    )
    .bind(status.as_str())
    .bind(sentiment.as_str())
    .bind(responded_at)
    .bind(nudge_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Records a free-text response: verbatim text plus the classified sentiment.
pub async fn record_text_response(
    pool: &PgPool,
    nudge_id: Uuid,
    response_text: &str,
    sentiment: Sentiment,
    responded_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        "UPDATE nudges SET response_text = $1, ai_sentiment = $2, responded_at = $3, \
         updated_at = now() WHERE id = $4",
    )
    .bind(response_text)
    .bind(sentiment.as_str())
    .bind(responded_at)
    .bind(nudge_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// The single most recent nudge for a user still awaiting a reply
/// (status = sent, responded_at null). This is the reply correlator's
/// contract: when several are unresponded, the newest wins.
pub async fn latest_unresponded_nudge(pool: &PgPool, user_id: Uuid) -> Result<Option<NudgeRow>> {
    let nudge = sqlx::query_as::<_, NudgeRow>(
        "SELECT * FROM nudges WHERE user_id = $1 AND status = 'sent' \
         AND responded_at IS NULL ORDER BY created_at DESC LIMIT 1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(nudge)
}
