use std::sync::Arc;

use sqlx::PgPool;

use crate::calendar::CalendarClient;
use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::nudge::matcher::NudgeMatcher;
use crate::telegram::TelegramClient;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub llm: LlmClient,
    pub telegram: TelegramClient,
    pub calendar: CalendarClient,
    /// Pluggable task-to-slot matcher. Default: LlmNudgeMatcher.
    pub matcher: Arc<dyn NudgeMatcher>,
    pub config: Config,
}
