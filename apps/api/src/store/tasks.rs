use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::task::{EnergyLevel, TaskRow, TaskStatus};

/// The "active task" predicate: not completed, not deleted, not snoozed.
const ACTIVE_FILTER: &str =
    "status IN ('pending', 'in_progress') AND (snoozed_until IS NULL OR snoozed_until < now())";

/// Priority ordering shared by every task listing.
const PRIORITY_ORDER: &str = "ORDER BY urgency DESC, importance DESC, created_at ASC";

/// Active tasks for a user, highest priority first.
pub async fn active_tasks(pool: &PgPool, user_id: Uuid) -> Result<Vec<TaskRow>> {
    let query = format!(
        "SELECT * FROM tasks WHERE user_id = $1 AND {ACTIVE_FILTER} {PRIORITY_ORDER}"
    );
    let tasks = sqlx::query_as::<_, TaskRow>(&query)
        .bind(user_id)
        .fetch_all(pool)
        .await?;
    Ok(tasks)
}

/// Tasks in one explicit status, still excluding snoozed ones.
pub async fn tasks_by_status(
    pool: &PgPool,
    user_id: Uuid,
    status: TaskStatus,
) -> Result<Vec<TaskRow>> {
    let query = format!(
        "SELECT * FROM tasks WHERE user_id = $1 AND status = $2 \
         AND (snoozed_until IS NULL OR snoozed_until < now()) {PRIORITY_ORDER}"
    );
    let tasks = sqlx::query_as::<_, TaskRow>(&query)
        .bind(user_id)
        .bind(status.as_str())
        .fetch_all(pool)
        .await?;
    Ok(tasks)
}

/// Insert payload for the create action. Numeric fields arrive pre-clamped.
#[derive(Debug)]
pub struct NewTask {
    pub user_id: Uuid,
    pub raw_input: String,
    pub title: String,
    pub description: Option<String>,
    pub urgency: i32,
    pub importance: i32,
    pub estimated_minutes: Option<i32>,
    pub due_date: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub tags: Vec<String>,
    pub energy_level: EnergyLevel,
    pub can_be_split: bool,
    pub recurrence: Option<String>,
    pub ai_conversation: Value,
}

pub async fn insert_task(pool: &PgPool, task: NewTask) -> Result<TaskRow> {
    let row = sqlx::query_as::<_, TaskRow>(
        r#"
        INSERT INTO tasks
            (user_id, raw_input, title, description, urgency, importance,
             estimated_minutes, due_date, location, tags, energy_level,
             can_be_split, recurrence, status, ai_conversation)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
        RETURNING *
        "#,
    )
    .bind(task.user_id)
    .bind(&task.raw_input)
    .bind(&task.title)
    .bind(&task.description)
    .bind(task.urgency)
    .bind(task.importance)
    .bind(task.estimated_minutes)
    .bind(task.due_date)
    .bind(&task.location)
    .bind(&task.tags)
    .bind(task.energy_level.as_str())
    .bind(task.can_be_split)
    .bind(&task.recurrence)
    .bind(TaskStatus::Pending.as_str())
    .bind(&task.ai_conversation)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Sets the task status. The transition is idempotent — repeating it leaves
/// the row unchanged rather than erroring.
pub async fn set_status(pool: &PgPool, task_id: Uuid, status: TaskStatus) -> Result<TaskRow> {
    let row = sqlx::query_as::<_, TaskRow>(
        "UPDATE tasks SET status = $1, updated_at = now() WHERE id = $2 RETURNING *",
    )
    .bind(status.as_str())
    .bind(task_id)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Marks a task started and schedules the follow-up check.
pub async fn start_task(
    pool: &PgPool,
    task_id: Uuid,
    follow_up_at: DateTime<Utc>,
) -> Result<TaskRow> {
    let row = sqlx::query_as::<_, TaskRow>(
        "UPDATE tasks SET status = $1, follow_up_at = $2, updated_at = now() \
         WHERE id = $3 RETURNING *",
    )
    .bind(TaskStatus::InProgress.as_str())
    .bind(follow_up_at)
    .bind(task_id)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Hides a task until the given timestamp.
pub async fn snooze_task(
    pool: &PgPool,
    task_id: Uuid,
    snoozed_until: DateTime<Utc>,
) -> Result<TaskRow> {
    let row = sqlx::query_as::<_, TaskRow>(
        "UPDATE tasks SET snoozed_until = $1, updated_at = now() WHERE id = $2 RETURNING *",
    )
    .bind(snoozed_until)
    .bind(task_id)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Field patch for POST /api/update-task. Only the fields named here can be
/// written from the outside; anything else in the request body is ignored.
#[derive(Debug, Default, Deserialize)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub urgency: Option<i32>,
    pub importance: Option<i32>,
    pub due_date: Option<DateTime<Utc>>,
    pub estimated_minutes: Option<i32>,
    pub energy_level: Option<EnergyLevel>,
    pub can_be_split: Option<bool>,
    pub recurrence: Option<String>,
    pub location: Option<String>,
    pub tags: Option<Vec<String>>,
    pub status: Option<TaskStatus>,
    pub snoozed_until: Option<DateTime<Utc>>,
    pub follow_up_at: Option<DateTime<Utc>>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.urgency.is_none()
            && self.importance.is_none()
            && self.due_date.is_none()
            && self.estimated_minutes.is_none()
            && self.energy_level.is_none()
            && self.can_be_split.is_none()
            && self.recurrence.is_none()
            && self.location.is_none()
            && self.tags.is_none()
            && self.status.is_none()
            && self.snoozed_until.is_none()
            && self.follow_up_at.is_none()
    }
}

/// Applies a field patch and returns the updated row.
pub async fn patch_task(pool: &PgPool, task_id: Uuid, patch: &TaskPatch) -> Result<TaskRow, AppError> {
    if patch.is_empty() {
        return Err(AppError::Validation(
            "fields must contain at least one updatable field".to_string(),
        ));
    }

    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE tasks SET updated_at = now()");

    if let Some(v) = &patch.title {
        qb.push(", title = ").push_bind(v);
    }
    if let Some(v) = &patch.description {
        qb.push(", description = ").push_bind(v);
    }
    if let Some(v) = patch.urgency {
        qb.push(", urgency = ").push_bind(v.clamp(1, 5));
    }
    if let Some(v) = patch.importance {
        qb.push(", importance = ").push_bind(v.clamp(1, 5));
    }
    if let Some(v) = patch.due_date {
        qb.push(", due_date = ").push_bind(v);
    }
    if let Some(v) = patch.estimated_minutes {
        qb.push(", estimated_minutes = ").push_bind(v);
    }
    if let Some(v) = patch.energy_level {
        qb.push(", energy_level = ").push_bind(v.as_str());
    }
    if let Some(v) = patch.can_be_split {
        qb.push(", can_be_split = ").push_bind(v);
    }
    if let Some(v) = &patch.recurrence {
        qb.push(", recurrence = ").push_bind(v);
    }
    if let Some(v) = &patch.location {
        qb.push(", location = ").push_bind(v);
    }
    if let Some(v) = &patch.tags {
        qb.push(", tags = ").push_bind(v);
    }
    if let Some(v) = patch.status {
        qb.push(", status = ").push_bind(v.as_str());
    }
    if let Some(v) = patch.snoozed_until {
        qb.push(", snoozed_until = ").push_bind(v);
    }
    if let Some(v) = patch.follow_up_at {
        qb.push(", follow_up_at = ").push_bind(v);
    }

    qb.push(" WHERE id = ").push_bind(task_id);
    qb.push(" RETURNING *");

    let row = qb
        .build_query_as::<TaskRow>()
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound(format!("Task {task_id} not found")))?;
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_patch_detected() {
        let patch = TaskPatch::default();
        assert!(patch.is_empty());
    }

    #[test]
    fn test_patch_with_one_field_not_empty() {
        let patch = TaskPatch {
            status: Some(TaskStatus::Completed),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }

    #[test]
    fn test_patch_ignores_unknown_fields_on_deserialize() {
        let patch: TaskPatch =
            serde_json::from_str(r#"{"urgency": 4, "not_a_field": true}"#).unwrap();
        assert_eq!(patch.urgency, Some(4));
    }
}
