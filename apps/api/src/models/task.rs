use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// Task lifecycle states. "deleted" is a soft delete — rows are never removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Deleted,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Deleted => "deleted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TaskStatus::Pending),
            "in_progress" => Some(TaskStatus::InProgress),
            "completed" => Some(TaskStatus::Completed),
            "deleted" => Some(TaskStatus::Deleted),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergyLevel {
    Low,
    Medium,
    High,
}

impl EnergyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnergyLevel::Low => "low",
            EnergyLevel::Medium => "medium",
            EnergyLevel::High => "high",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TaskRow {
    pub id: Uuid,
    pub user_id: Uuid,
    /// The verbatim user message that produced this task.
    pub raw_input: String,
    pub title: String,
    pub description: Option<String>,
    /// 1-5 ordinal scale.
    pub urgency: i32,
    /// 1-5 ordinal scale.
    pub importance: i32,
    pub due_date: Option<DateTime<Utc>>,
    pub estimated_minutes: Option<i32>,
    pub energy_level: String,
    pub can_be_split: bool,
    pub recurrence: Option<String>,
    pub location: Option<String>,
    pub depends_on: Option<Uuid>,
    pub tags: Vec<String>,
    pub status: String,
    pub snoozed_until: Option<DateTime<Utc>>,
    pub follow_up_at: Option<DateTime<Utc>>,
    /// Conversation trace attached at creation, kept for audit/display.
    pub ai_conversation: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
