//! Feature engineering for energy consumption models
//!
//! Turns raw sensor records into named numeric features. The same
//! record-level derivation runs at training and at prediction time, so the
//! feature vectors the model sees are built identically on both paths.
//!
//! # Stages
//! - [`calendar`]: hour, month, day of year, season and cyclical encodings
//! - [`categorical`]: strict On/Off, Yes/No and weekday mapping
//! - [`interaction`]: products and ratios of record fields
//! - [`temporal`]: lag and moving-average columns (datasets only)
//! - [`schema`] and [`assembler`]: ordered model inputs

pub mod assembler;
pub mod calendar;
pub mod categorical;
pub mod interaction;
pub mod schema;
pub mod temporal;

pub use assembler::assemble;
pub use calendar::{parse_timestamp, CalendarFeatures};
pub use schema::{FeatureSchema, FeatureSource, FeatureSpec, SchemaKind};

use thiserror::Error;
use tracing::warn;

use crate::domain::{RawRecord, TARGET_COLUMN};

/// Feature derivation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeatureError {
    #[error("failed to parse timestamp '{value}' (expected DD-MM-YYYY HH:MM): {source}")]
    Timestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
    #[error("invalid value '{value}' for {field}")]
    InvalidValue { field: &'static str, value: String },
    #[error("missing feature: {0}")]
    MissingFeature(String),
    #[error("unknown feature: {0}")]
    UnknownFeature(String),
    #[error("duplicate feature: {0}")]
    DuplicateFeature(String),
    #[error("feature {0} cannot be derived from a single record")]
    NotRecordDerivable(String),
    #[error("feature count mismatch: {values} values, {names} names")]
    LengthMismatch { values: usize, names: usize },
    #[error("missing EnergyConsumption value at row {0}")]
    MissingTarget(usize),
    #[error("moving average window must be at least 1")]
    ZeroWindow,
}

impl FeatureError {
    pub fn invalid(field: &'static str, value: &str) -> Self {
        FeatureError::InvalidValue {
            field,
            value: value.to_string(),
        }
    }
}

/// Named feature values in derivation order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivedFeatures {
    values: Vec<(String, f64)>,
}

impl DerivedFeatures {
    /// Insert or overwrite a value
    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        let name = name.into();
        match self.values.iter().position(|(n, _)| *n == name) {
            Some(i) => self.values[i].1 = value,
            None => self.values.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(n, v)| (n.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Derive every feature a single record supports.
///
/// Calendar columns are only produced when the record has a timestamp, and
/// `EnergyConsumption`/`Energy_per_sqft` only when it carries the target.
pub fn derive_record_features(record: &RawRecord) -> Result<DerivedFeatures, FeatureError> {
    let mut out = DerivedFeatures::default();

    out.insert("Temperature", record.temperature);
    out.insert("Humidity", record.humidity);
    out.insert("SquareFootage", record.square_footage as f64);
    out.insert("Occupancy", record.occupancy as f64);
    out.insert(
        "HVACUsage",
        categorical::switch_code("HVACUsage", &record.hvac_usage)?,
    );
    out.insert(
        "LightingUsage",
        categorical::switch_code("LightingUsage", &record.lighting_usage)?,
    );
    out.insert("RenewableEnergy", record.renewable_energy);

    let day = categorical::day_of_week(&record.day_of_week)?;
    out.insert("DayOfWeek", day.index() as f64);
    out.insert("IsWeekend", if day.is_weekend() { 1.0 } else { 0.0 });
    out.insert("Holiday", categorical::answer_code("Holiday", &record.holiday)?);

    if let Some(raw) = &record.timestamp {
        for (name, value) in CalendarFeatures::parse(raw)?.columns() {
            out.insert(name, value);
        }
    }

    out.insert(
        "Temp_Humidity",
        interaction::temp_humidity(record.temperature, record.humidity),
    );
    out.insert(
        "Occupancy_SquareFootage",
        interaction::occupancy_square_footage(record.occupancy, record.square_footage),
    );

    if let Some(energy) = record.energy_consumption {
        out.insert(TARGET_COLUMN, energy);
        if let Some(per_sqft) = interaction::energy_per_sqft(energy, record.square_footage) {
            out.insert("Energy_per_sqft", per_sqft);
        }
    }

    Ok(out)
}

/// One row of an engineered dataset
#[derive(Debug, Clone, PartialEq)]
pub struct EngineeredRow {
    /// Ordering key, restored as a plain column
    pub timestamp: Option<String>,
    pub features: DerivedFeatures,
}

/// Apply all feature engineering to a dataset.
///
/// When every record has a timestamp the rows are stable-sorted by time and
/// lag/moving-average columns of the target are appended; otherwise the
/// series stage is skipped. The target must be present on every row.
pub fn engineer_dataset(
    records: &[RawRecord],
    lags: &[usize],
    windows: &[usize],
) -> Result<Vec<EngineeredRow>, FeatureError> {
    let time_indexed = !records.is_empty() && records.iter().all(|r| r.timestamp.is_some());

    let mut keyed = Vec::with_capacity(records.len());
    for (row, record) in records.iter().enumerate() {
        if record.energy_consumption.is_none() {
            return Err(FeatureError::MissingTarget(row));
        }
        let key = match (&record.timestamp, time_indexed) {
            (Some(raw), true) => Some(parse_timestamp(raw)?),
            _ => None,
        };
        keyed.push((key, record));
    }

    if time_indexed {
        keyed.sort_by_key(|(key, _)| *key);
    } else if !records.is_empty() {
        warn!("dataset has rows without a Timestamp; skipping lag and moving-average features");
    }

    let mut rows = Vec::with_capacity(keyed.len());
    let mut target = Vec::with_capacity(keyed.len());
    for (_, record) in &keyed {
        target.push(record.energy_consumption.unwrap_or_default());
        rows.push(EngineeredRow {
            timestamp: record.timestamp.clone(),
            features: derive_record_features(record)?,
        });
    }

    if time_indexed {
        for (name, column) in temporal::series_columns(TARGET_COLUMN, &target, lags, windows)? {
            for (row, value) in rows.iter_mut().zip(column) {
                row.features.insert(name.clone(), value);
            }
        }
    }

    Ok(rows)
}
