use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use validator::Validate;

/// Name of the prediction target column.
pub const TARGET_COLUMN: &str = "EnergyConsumption";

/// One observation of building sensor data.
///
/// Field names serialize exactly as they appear in the CSV header and in
/// prediction requests (`HVACUsage`, `SquareFootage`, ...). Categorical
/// fields are kept as raw text; mapping them to numeric codes is the job of
/// the categorical normalizer, which rejects unknown values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "PascalCase")]
pub struct RawRecord {
    /// `DD-MM-YYYY HH:MM`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    pub temperature: f64,
    pub humidity: f64,
    #[validate(range(min = 1, message = "square footage must be at least 1"))]
    pub square_footage: i64,
    #[validate(range(min = 0, message = "occupancy cannot be negative"))]
    pub occupancy: i64,
    #[serde(rename = "HVACUsage")]
    pub hvac_usage: String,
    pub lighting_usage: String,
    pub renewable_energy: f64,
    pub day_of_week: String,
    pub holiday: String,
    /// Only present in training data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy_consumption: Option<f64>,
}

/// Day names as they appear in the `DayOfWeek` column.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr,
    EnumIter,
)]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    /// Monday=0 ... Sunday=6
    pub fn index(self) -> u32 {
        self as u32
    }

    pub fn is_weekend(self) -> bool {
        matches!(self, DayOfWeek::Saturday | DayOfWeek::Sunday)
    }
}

/// `HVACUsage` / `LightingUsage` states
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display, AsRefStr, EnumIter)]
pub enum Switch {
    On,
    Off,
}

impl Switch {
    pub fn code(self) -> u8 {
        match self {
            Switch::On => 1,
            Switch::Off => 0,
        }
    }
}

/// `Holiday` answers
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display, AsRefStr, EnumIter)]
pub enum Answer {
    Yes,
    No,
}

impl Answer {
    pub fn code(self) -> u8 {
        match self {
            Answer::Yes => 1,
            Answer::No => 0,
        }
    }
}

/// Meteorological season derived from the month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumIter)]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Fall,
}

impl Season {
    pub fn from_month(month: u32) -> Self {
        match month {
            12 | 1 | 2 => Season::Winter,
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            _ => Season::Fall,
        }
    }

    /// Winter=0, Spring=1, Summer=2, Fall=3
    pub fn code(self) -> u32 {
        self as u32
    }
}
