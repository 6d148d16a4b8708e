//! Chat-driven task agent: one conversational turn in, one AI decision out,
//! dispatched onto task state transitions.

pub mod actions;
pub mod handlers;
pub mod prompts;
