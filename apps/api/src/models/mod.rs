pub mod nudge;
pub mod task;
pub mod user;
