//! Inbound Telegram updates: button callbacks and free-text replies to
//! nudges. Stray messages with no matching user or outstanding nudge are
//! silently ignored.

pub mod handlers;
pub mod prompts;
