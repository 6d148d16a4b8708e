use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::user::UserRow;

/// All users eligible to receive nudges, i.e. with a Telegram chat configured.
pub async fn nudge_recipients(pool: &PgPool) -> Result<Vec<UserRow>> {
    let users = sqlx::query_as::<_, UserRow>(
        "SELECT * FROM users WHERE telegram_chat_id IS NOT NULL ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;
    Ok(users)
}

/// Maps an inbound chat identity back to a user. `None` means the message
/// has no known sender and is silently ignored upstream.
pub async fn find_by_chat_id(pool: &PgPool, chat_id: &str) -> Result<Option<UserRow>> {
    let user = sqlx::query_as::<_, UserRow>(
        "SELECT * FROM users WHERE telegram_chat_id = $1 LIMIT 1",
    )
    .bind(chat_id)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

pub async fn set_nudge_paused_until(
    pool: &PgPool,
    user_id: Uuid,
    paused_until: DateTime<Utc>,
) -> Result<()> {
    sqlx::query("UPDATE users SET nudge_paused_until = $1, updated_at = now() WHERE id = $2")
        .bind(paused_until)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}
