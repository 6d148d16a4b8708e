//! Named query contracts over the three tables. Each operation the rest of
//! the system relies on for correctness (active-task predicate, today's
//! nudges, latest unresponded nudge) lives here under an explicit name
//! instead of inline filter chains.

pub mod nudges;
pub mod tasks;
pub mod users;
