//! Strict mapping of textual categorical fields to numeric codes.
//!
//! Unknown values are rejected, never defaulted.

use std::str::FromStr;

use super::FeatureError;
use crate::domain::{Answer, DayOfWeek, Switch};

/// `"On"` -> 1, `"Off"` -> 0
pub fn switch_code(field: &'static str, value: &str) -> Result<f64, FeatureError> {
    Switch::from_str(value)
        .map(|s| s.code() as f64)
        .map_err(|_| FeatureError::invalid(field, value))
}

/// `"Yes"` -> 1, `"No"` -> 0
pub fn answer_code(field: &'static str, value: &str) -> Result<f64, FeatureError> {
    Answer::from_str(value)
        .map(|a| a.code() as f64)
        .map_err(|_| FeatureError::invalid(field, value))
}

pub fn day_of_week(value: &str) -> Result<DayOfWeek, FeatureError> {
    DayOfWeek::from_str(value).map_err(|_| FeatureError::invalid("DayOfWeek", value))
}
