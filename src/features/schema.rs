//! Feature schema: the ordered list of model inputs shared by training and
//! prediction.

use serde::{Deserialize, Serialize};

use super::FeatureError;
use crate::domain::TARGET_COLUMN;

/// Where a feature's value comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureSource {
    /// Numeric field copied from the record
    Raw,
    /// Normalized categorical field
    Categorical,
    /// Derived from the timestamp
    Calendar,
    /// Product of two record fields
    Interaction,
    /// Needs neighbouring rows (lags, moving averages)
    Series,
    /// Needs the prediction target
    Target,
}

impl FeatureSource {
    /// Whether a single prediction record carries enough to compute it
    pub fn is_record_derivable(self) -> bool {
        !matches!(self, FeatureSource::Series | FeatureSource::Target)
    }
}

const RAW: &[&str] = &[
    "Temperature",
    "Humidity",
    "SquareFootage",
    "Occupancy",
    "RenewableEnergy",
];

const CATEGORICAL: &[&str] = &[
    "HVACUsage",
    "LightingUsage",
    "Holiday",
    "DayOfWeek",
    "IsWeekend",
];

const CALENDAR: &[&str] = &[
    "Hour",
    "Month",
    "Year",
    "DayOfYear",
    "Season",
    "Hour_sin",
    "Hour_cos",
    "Month_sin",
    "Month_cos",
    "DayOfYear_sin",
    "DayOfYear_cos",
];

const INTERACTION: &[&str] = &["Temp_Humidity", "Occupancy_SquareFootage"];

const BASELINE: &[&str] = &[
    "Temperature",
    "Humidity",
    "SquareFootage",
    "Occupancy",
    "HVACUsage",
    "LightingUsage",
    "RenewableEnergy",
    "DayOfWeek",
    "Holiday",
    "Hour",
    "Month",
];

const EXTENDED_EXTRA: &[&str] = &[
    "Year",
    "DayOfYear",
    "Season",
    "IsWeekend",
    "Hour_sin",
    "Hour_cos",
    "Month_sin",
    "Month_cos",
    "DayOfYear_sin",
    "DayOfYear_cos",
    "Temp_Humidity",
    "Occupancy_SquareFootage",
];

/// Classify a feature name; `None` for names no stage derives
pub fn classify(name: &str) -> Option<FeatureSource> {
    if RAW.contains(&name) {
        return Some(FeatureSource::Raw);
    }
    if CATEGORICAL.contains(&name) {
        return Some(FeatureSource::Categorical);
    }
    if CALENDAR.contains(&name) {
        return Some(FeatureSource::Calendar);
    }
    if INTERACTION.contains(&name) {
        return Some(FeatureSource::Interaction);
    }
    if name == TARGET_COLUMN || name == "Energy_per_sqft" {
        return Some(FeatureSource::Target);
    }

    let series_suffix = name
        .strip_prefix(TARGET_COLUMN)
        .and_then(|rest| rest.strip_prefix("_lag_").or_else(|| rest.strip_prefix("_ma_")));
    match series_suffix {
        Some(n) if n.parse::<usize>().is_ok() => Some(FeatureSource::Series),
        _ => None,
    }
}

/// Preset schemas selectable from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SchemaKind {
    #[default]
    Baseline,
    Extended,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSpec {
    pub name: String,
    pub source: FeatureSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    features: Vec<FeatureSpec>,
}

impl FeatureSchema {
    /// The eleven raw, categorical and calendar inputs of the reference model
    pub fn baseline() -> Self {
        Self::from_known(BASELINE.iter().copied())
    }

    /// Baseline plus calendar, cyclical and interaction features
    pub fn extended() -> Self {
        Self::from_known(BASELINE.iter().chain(EXTENDED_EXTRA).copied())
    }

    pub fn preset(kind: SchemaKind) -> Self {
        match kind {
            SchemaKind::Baseline => Self::baseline(),
            SchemaKind::Extended => Self::extended(),
        }
    }

    fn from_known<'a>(names: impl Iterator<Item = &'a str>) -> Self {
        let features = names
            .filter_map(|name| {
                classify(name).map(|source| FeatureSpec {
                    name: name.to_string(),
                    source,
                })
            })
            .collect();
        Self { features }
    }

    /// Build a schema from an ordered name list, e.g. a persisted
    /// `features.txt`.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, FeatureError> {
        let mut features = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            let source = classify(name).ok_or_else(|| FeatureError::UnknownFeature(name.to_string()))?;
            if features.iter().any(|f: &FeatureSpec| f.name == name) {
                return Err(FeatureError::DuplicateFeature(name.to_string()));
            }
            features.push(FeatureSpec {
                name: name.to_string(),
                source,
            });
        }
        Ok(Self { features })
    }

    /// Reject features a lone prediction record cannot reproduce
    pub fn ensure_record_derivable(&self) -> Result<(), FeatureError> {
        match self.features.iter().find(|f| !f.source.is_record_derivable()) {
            Some(f) => Err(FeatureError::NotRecordDerivable(f.name.clone())),
            None => Ok(()),
        }
    }

    pub fn names(&self) -> Vec<String> {
        self.features.iter().map(|f| f.name.clone()).collect()
    }

    pub fn features(&self) -> &[FeatureSpec] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}
