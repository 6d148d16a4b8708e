mod agent;
mod calendar;
mod config;
mod db;
mod errors;
mod llm_client;
mod models;
mod nudge;
mod routes;
mod state;
mod store;
mod telegram;
mod timectx;
mod webhook;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::calendar::CalendarClient;
use crate::config::Config;
use crate::db::create_pool;
use crate::llm_client::LlmClient;
use crate::nudge::matcher::LlmNudgeMatcher;
use crate::routes::build_router;
use crate::state::AppState;
use crate::telegram::TelegramClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            // tracing targets use the crate name with underscores
            let target = env!("CARGO_PKG_NAME").replace('-', "_");
            EnvFilter::new(format!("{target}={}", &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Zen Tasks API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    // Initialize LLM client
    let llm = LlmClient::new(config.anthropic_api_key.clone());
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    // Initialize Telegram client
    let telegram = TelegramClient::new(config.telegram_bot_token.clone());
    info!("Telegram client initialized");

    // Initialize Google Calendar client (degrades to empty when unconfigured)
    let calendar = CalendarClient::new(config.google.clone());
    info!(
        "Calendar client initialized (configured: {})",
        config.google.is_some()
    );

    // Initialize nudge matcher
    let matcher = Arc::new(LlmNudgeMatcher::new(llm.clone()));

    // Build app state
    let state = AppState {
        db,
        llm,
        telegram,
        calendar,
        matcher,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
