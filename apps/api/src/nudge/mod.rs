//! Proactive reminders ("nudges"): the periodic job that decides, per user,
//! whether today's conditions permit a reminder, finds a free calendar slot,
//! asks the AI to match a task to it, and delivers the result over Telegram.

pub mod eligibility;
pub mod handlers;
pub mod matcher;
pub mod prompts;

/// Look-ahead window for free-slot computation.
pub const NUDGE_WINDOW_HOURS: i64 = 2;
/// Minimum usable free-slot duration.
pub const MIN_SLOT_MINUTES: i64 = 15;
/// Hard daily cap on unacknowledged reminders.
pub const MAX_UNANSWERED_PER_DAY: usize = 2;
/// Cooldown after a nudge while one is still unanswered.
pub const COOLDOWN_MINUTES: i64 = 60;
