//! Calendar windows during which actions are allowed

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// An absolute validity range narrowed by hour-of-day and weekday (UTC).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    /// `None` means no upper bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
    /// First allowed hour of the day, inclusive
    #[serde(default)]
    pub start_hour: u8,
    /// Last allowed hour, inclusive; may wrap past midnight
    #[serde(default = "last_hour")]
    pub end_hour: u8,
    /// Empty means every day
    #[serde(default)]
    pub days: Vec<Weekday>,
}

fn last_hour() -> u8 {
    23
}

impl TimeWindow {
    /// Any hour, any day, from `start` on
    pub fn starting(start: DateTime<Utc>) -> Self {
        Self {
            start,
            end: None,
            start_hour: 0,
            end_hour: last_hour(),
            days: Vec::new(),
        }
    }

    pub fn until(mut self, end: DateTime<Utc>) -> Self {
        self.end = Some(end);
        self
    }

    /// Restrict to hours `[start_hour, end_hour]`. A start later than the end
    /// wraps past midnight.
    pub fn hours(mut self, start_hour: u8, end_hour: u8) -> Self {
        self.start_hour = start_hour;
        self.end_hour = end_hour;
        self
    }

    pub fn on_days(mut self, days: impl IntoIterator<Item = Weekday>) -> Self {
        self.days = days.into_iter().collect();
        self
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        if now < self.start {
            return false;
        }
        if matches!(self.end, Some(end) if now > end) {
            return false;
        }

        let hour = now.hour() as u8;
        let in_hours = if self.start_hour <= self.end_hour {
            hour >= self.start_hour && hour <= self.end_hour
        } else {
            hour >= self.start_hour || hour <= self.end_hour
        };
        if !in_hours {
            return false;
        }

        self.days.is_empty() || self.days.contains(&now.weekday())
    }
}
