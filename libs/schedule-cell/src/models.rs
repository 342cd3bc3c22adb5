use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A recurring weekly availability window for a doctor. Times are stored as
/// zero-padded `HH:mm` strings; lexical ordering on them matches clock order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleBlock {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub day_of_week: i32, // 0 = Sunday, 1 = Monday, etc.
    pub start_time: String,
    pub end_time: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Display form of a schedule block with the weekday spelled out.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleBlockView {
    #[serde(flatten)]
    pub block: ScheduleBlock,
    pub day_name: &'static str,
}

impl From<ScheduleBlock> for ScheduleBlockView {
    fn from(block: ScheduleBlock) -> Self {
        let day_name = day_name(block.day_of_week);
        Self { block, day_name }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateScheduleRequest {
    pub doctor_id: Uuid,
    pub day_of_week: i32,
    pub start_time: String,
    pub end_time: String,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateScheduleRequest {
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ScheduleError {
    #[error("Invalid {field}: {value}. Use HH:mm format")]
    InvalidTimeFormat { field: &'static str, value: String },

    #[error("day_of_week must be between 0 (Sunday) and 6 (Saturday), got {0}")]
    InvalidDayOfWeek(i32),

    #[error("start_time must be before end_time")]
    InvalidTimeRange,

    #[error("Schedule not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),
}

static TIME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([01][0-9]|2[0-3]):[0-5][0-9]$").expect("time pattern is valid")
});

/// Strict `HH:mm` check, zero-padded hours 00-23 and minutes 00-59.
pub fn is_valid_time(value: &str) -> bool {
    TIME_PATTERN.is_match(value)
}

/// Day-of-week index for a date, 0 = Sunday through 6 = Saturday.
pub fn weekday_index(date: NaiveDate) -> i32 {
    match date.weekday() {
        Weekday::Sun => 0,
        Weekday::Mon => 1,
        Weekday::Tue => 2,
        Weekday::Wed => 3,
        Weekday::Thu => 4,
        Weekday::Fri => 5,
        Weekday::Sat => 6,
    }
}

pub fn day_name(day: i32) -> &'static str {
    match day {
        0 => "Sunday",
        1 => "Monday",
        2 => "Tuesday",
        3 => "Wednesday",
        4 => "Thursday",
        5 => "Friday",
        6 => "Saturday",
        _ => "Unknown",
    }
}

impl fmt::Display for ScheduleBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}-{} (doctor {})",
            day_name(self.day_of_week),
            self.start_time,
            self.end_time,
            self.doctor_id
        )
    }
}
