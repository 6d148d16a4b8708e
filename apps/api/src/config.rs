use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub anthropic_api_key: String,
    pub telegram_bot_token: String,
    /// Google Calendar OAuth credentials. When absent the calendar client
    /// degrades to empty results instead of failing callers.
    pub google: Option<GoogleConfig>,
    /// Shared secret for GET /api/cron/nudge. When unset the endpoint is open.
    pub cron_secret: Option<String>,
    pub port: u16,
    pub rust_log: String,
}

#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let google = match (
            optional_env("GOOGLE_CLIENT_ID"),
            optional_env("GOOGLE_CLIENT_SECRET"),
            optional_env("GOOGLE_REFRESH_TOKEN"),
        ) {
            (Some(client_id), Some(client_secret), Some(refresh_token)) => Some(GoogleConfig {
                client_id,
                client_secret,
                refresh_token,
            }),
            _ => None,
        };

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            telegram_bot_token: require_env("TELEGRAM_BOT_TOKEN")?,
            google,
            cron_secret: optional_env("CRON_SECRET"),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
