//! Time-Context Provider — classifies "now" into a day-part bucket plus
//! weekend/business-hours flags. Pure function of wall-clock time; feeds the
//! task-agent prompt so suggestions fit the time of day.

use chrono::{DateTime, Datelike, Local, Timelike, Weekday};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeOfDay {
    EarlyMorning,
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl TimeOfDay {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeOfDay::EarlyMorning => "early_morning",
            TimeOfDay::Morning => "morning",
            TimeOfDay::Afternoon => "afternoon",
            TimeOfDay::Evening => "evening",
            TimeOfDay::Night => "night",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TimeContext {
    pub current_time: String,
    pub time_of_day: TimeOfDay,
    pub day_of_week: String,
    pub is_weekend: bool,
    pub is_business_hours: bool,
}

impl TimeContext {
    pub fn now() -> Self {
        Self::at(Local::now())
    }

    /// Builds the context from an arbitrary instant. Split out from `now()`
    /// so the bucketing rules are testable.
    pub fn at(now: DateTime<Local>) -> Self {
        let hour = now.hour();
        let weekday = now.weekday();
        let is_weekend = matches!(weekday, Weekday::Sat | Weekday::Sun);

        let time_of_day = match hour {
            h if h < 9 => TimeOfDay::EarlyMorning,
            h if h < 12 => TimeOfDay::Morning,
            h if h < 17 => TimeOfDay::Afternoon,
            h if h < 20 => TimeOfDay::Evening,
            _ => TimeOfDay::Night,
        };

        TimeContext {
            current_time: now.to_rfc3339(),
            time_of_day,
            day_of_week: weekday_name(weekday).to_string(),
            is_weekend,
            is_business_hours: (8..18).contains(&hour) && !is_weekend,
        }
    }
}

fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn local(y: i32, mo: u32, d: u32, h: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, mo, d, h, 30, 0).unwrap()
    }

    #[test]
    fn test_early_morning_bucket() {
        // 2026-01-05 is a Monday
        let ctx = TimeContext::at(local(2026, 1, 5, 7));
        assert_eq!(ctx.time_of_day, TimeOfDay::EarlyMorning);
        assert_eq!(ctx.day_of_week, "Monday");
        assert!(!ctx.is_weekend);
        assert!(!ctx.is_business_hours); // 7am is before 8am
    }

    #[test]
    fn test_afternoon_business_hours() {
        let ctx = TimeContext::at(local(2026, 1, 6, 14));
        assert_eq!(ctx.time_of_day, TimeOfDay::Afternoon);
        assert!(ctx.is_business_hours);
    }

    #[test]
    fn test_night_bucket() {
        let ctx = TimeContext::at(local(2026, 1, 6, 22));
        assert_eq!(ctx.time_of_day, TimeOfDay::Night);
        assert!(!ctx.is_business_hours);
    }

    #[test]
    fn test_weekend_never_business_hours() {
        // 2026-01-10 is a Saturday
        let ctx = TimeContext::at(local(2026, 1, 10, 10));
        assert_eq!(ctx.time_of_day, TimeOfDay::Morning);
        assert!(ctx.is_weekend);
        assert!(!ctx.is_business_hours);
    }

    #[test]
    fn test_bucket_boundaries() {
        assert_eq!(
            TimeContext::at(local(2026, 1, 5, 9)).time_of_day,
            TimeOfDay::Morning
        );
        assert_eq!(
            TimeContext::at(local(2026, 1, 5, 12)).time_of_day,
            TimeOfDay::Afternoon
        );
        assert_eq!(
            TimeContext::at(local(2026, 1, 5, 17)).time_of_day,
            TimeOfDay::Evening
        );
        assert_eq!(
            TimeContext::at(local(2026, 1, 5, 20)).time_of_day,
            TimeOfDay::Night
        );
    }
}
