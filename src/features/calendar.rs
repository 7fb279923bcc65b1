//! Calendar features derived from the record timestamp

use chrono::{Datelike, NaiveDateTime, Timelike};
use std::f64::consts::PI;

use super::FeatureError;
use crate::domain::Season;

/// `DD-MM-YYYY HH:MM`
pub const TIMESTAMP_FORMAT: &str = "%d-%m-%Y %H:%M";

pub const HOURS_PER_DAY: f64 = 24.0;
pub const MONTHS_PER_YEAR: f64 = 12.0;
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Parse a record timestamp
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, FeatureError> {
    NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_FORMAT).map_err(|source| {
        FeatureError::Timestamp {
            value: raw.to_string(),
            source,
        }
    })
}

/// Sine/cosine pair for a periodic quantity
pub fn cyclical(value: f64, period: f64) -> (f64, f64) {
    let angle = 2.0 * PI * value / period;
    (angle.sin(), angle.cos())
}

/// Calendar features for a single timestamp
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalendarFeatures {
    /// Hour of day (0-23)
    pub hour: u32,
    /// Month (1-12)
    pub month: u32,
    pub year: i32,
    /// Day of year (1-366)
    pub day_of_year: u32,
}

impl CalendarFeatures {
    pub fn from_datetime(timestamp: NaiveDateTime) -> Self {
        Self {
            hour: timestamp.hour(),
            month: timestamp.month(),
            year: timestamp.year(),
            day_of_year: timestamp.ordinal(),
        }
    }

    pub fn parse(raw: &str) -> Result<Self, FeatureError> {
        parse_timestamp(raw).map(Self::from_datetime)
    }

    pub fn season(&self) -> Season {
        Season::from_month(self.month)
    }

    pub fn hour_cyclical(&self) -> (f64, f64) {
        cyclical(self.hour as f64, HOURS_PER_DAY)
    }

    pub fn month_cyclical(&self) -> (f64, f64) {
        cyclical(self.month as f64, MONTHS_PER_YEAR)
    }

    pub fn day_of_year_cyclical(&self) -> (f64, f64) {
        cyclical(self.day_of_year as f64, DAYS_PER_YEAR)
    }

    /// All calendar columns in derivation order
    pub fn columns(&self) -> Vec<(&'static str, f64)> {
        let (hour_sin, hour_cos) = self.hour_cyclical();
        let (month_sin, month_cos) = self.month_cyclical();
        let (doy_sin, doy_cos) = self.day_of_year_cyclical();

        vec![
            ("Hour", self.hour as f64),
            ("Month", self.month as f64),
            ("Year", self.year as f64),
            ("DayOfYear", self.day_of_year as f64),
            ("Season", self.season().code() as f64),
            ("Hour_sin", hour_sin),
            ("Hour_cos", hour_cos),
            ("Month_sin", month_sin),
            ("Month_cos", month_cos),
            ("DayOfYear_sin", doy_sin),
            ("DayOfYear_cos", doy_cos),
        ]
    }
}
