//! Google Calendar client — busy periods for the nudge window and upcoming
//! events for the task agent. Calendar data is advisory: every caller
//! downgrades a failure here to "no calendar info" instead of propagating.

pub mod slots;

use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

use crate::config::GoogleConfig;

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

#[derive(Debug, Error)]
pub enum CalendarError {
    #[error("calendar is not configured")]
    NotConfigured,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Google API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

/// A `[start, end)` interval during which the calendar is busy.
#[derive(Debug, Clone, PartialEq)]
pub struct BusyPeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// An upcoming event, shaped for the task-agent prompt. Start/end stay as the
/// provider's strings since all-day events carry dates, not timestamps.
#[derive(Debug, Clone, Serialize)]
pub struct CalendarEvent {
    pub id: String,
    pub summary: String,
    pub description: Option<String>,
    pub start: String,
    pub end: String,
    pub location: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct FreeBusyResponse {
    #[serde(default)]
    calendars: HashMap<String, FreeBusyCalendar>,
}

#[derive(Debug, Deserialize)]
struct FreeBusyCalendar {
    #[serde(default)]
    busy: Vec<FreeBusyPeriod>,
}

#[derive(Debug, Deserialize)]
struct FreeBusyPeriod {
    start: String,
    end: String,
}

#[derive(Debug, Deserialize)]
struct EventsResponse {
    #[serde(default)]
    items: Vec<EventItem>,
}

#[derive(Debug, Deserialize)]
struct EventItem {
    id: Option<String>,
    summary: Option<String>,
    description: Option<String>,
    start: Option<EventTime>,
    end: Option<EventTime>,
    location: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventTime {
    #[serde(rename = "dateTime")]
    date_time: Option<String>,
    date: Option<String>,
}

impl EventTime {
    fn as_iso(&self) -> String {
        self.date_time
            .clone()
            .or_else(|| self.date.clone())
            .unwrap_or_default()
    }
}

#[derive(Clone)]
pub struct CalendarClient {
    client: Client,
    auth: Option<GoogleConfig>,
}

impl CalendarClient {
    pub fn new(auth: Option<GoogleConfig>) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            auth,
        }
    }

    /// Exchanges the refresh token for a short-lived access token.
    /// Tokens are not cached — the calendar is queried at most a few times
    /// per scheduler tick.
    async fn access_token(&self) -> Result<String, CalendarError> {
        let auth = self.auth.as_ref().ok_or(CalendarError::NotConfigured)?;

        let response = self
            .client
            .post(TOKEN_URL)
            .form(&[
                ("client_id", auth.client_id.as_str()),
                ("client_secret", auth.client_secret.as_str()),
                ("refresh_token", auth.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CalendarError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let token: TokenResponse = response.json().await?;
        Ok(token.access_token)
    }

    /// Busy periods on the primary calendar for the next `hours` hours.
    pub async fn free_busy(&self, hours: i64) -> Result<Vec<BusyPeriod>, CalendarError> {
        let token = self.access_token().await?;
        let now = Utc::now();
        let window_end = now + Duration::hours(hours);

        let response = self
            .client
            .post(format!("{CALENDAR_API_BASE}/freeBusy"))
            .bearer_auth(&token)
            .json(&json!({
                "timeMin": now.to_rfc3339(),
                "timeMax": window_end.to_rfc3339(),
                "items": [{"id": "primary"}],
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CalendarError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let parsed: FreeBusyResponse = response.json().await?;
        let busy = parsed
            .calendars
            .get("primary")
            .map(|c| c.busy.as_slice())
            .unwrap_or_default()
            .iter()
            // Periods the provider returns malformed are dropped, not fatal.
            .filter_map(|p| {
                let start = DateTime::parse_from_rfc3339(&p.start).ok()?;
                let end = DateTime::parse_from_rfc3339(&p.end).ok()?;
                Some(BusyPeriod {
                    start: start.with_timezone(&Utc),
                    end: end.with_timezone(&Utc),
                })
            })
            .collect::<Vec<_>>();

        debug!(periods = busy.len(), "Fetched free/busy data");
        Ok(busy)
    }

    /// Upcoming events on the primary calendar for the next `days` days,
    /// expanded to single events and ordered by start time.
    pub async fn upcoming_events(&self, days: i64) -> Result<Vec<CalendarEvent>, CalendarError> {
        let token = self.access_token().await?;
        let now = Utc::now();
        let window_end = now + Duration::days(days);

        let response = self
            .client
            .get(format!("{CALENDAR_API_BASE}/calendars/primary/events"))
            .bearer_auth(&token)
            .query(&[
                ("timeMin", now.to_rfc3339()),
                ("timeMax", window_end.to_rfc3339()),
                ("maxResults", "100".to_string()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CalendarError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let parsed: EventsResponse = response.json().await?;
        let events = parsed
            .items
            .into_iter()
            .map(|e| CalendarEvent {
                id: e.id.unwrap_or_default(),
                summary: e.summary.unwrap_or_else(|| "Untitled Event".to_string()),
                description: e.description,
                start: e.start.map(|t| t.as_iso()).unwrap_or_default(),
                end: e.end.map(|t| t.as_iso()).unwrap_or_default(),
                location: e.location,
            })
            .collect::<Vec<_>>();

        debug!(events = events.len(), "Fetched upcoming events");
        Ok(events)
    }
}
