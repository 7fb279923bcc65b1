//! Preprocessing pipeline
//!
//! An ordered list of named transform stages applied to assembled feature
//! vectors before they reach the model. Stage parameters (scaler moments,
//! one-hot categories) are fitted once on the training split and persisted
//! with the model; inference never refits them.

use serde::{Deserialize, Serialize};

use super::FeatureVector;
use crate::features::FeatureError;

/// Which columns each stage applies to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSpec {
    /// Columns to z-score
    #[serde(default)]
    pub standardize: Vec<String>,
    /// Integer-coded columns to expand into indicator columns
    #[serde(default)]
    pub one_hot: Vec<String>,
}

impl PipelineSpec {
    /// Scale the continuous inputs and one-hot the seasonal codes, keeping
    /// only the columns present in `schema`.
    pub fn standard<S: AsRef<str>>(schema: &[S]) -> Self {
        let present = |cols: &[&str]| -> Vec<String> {
            cols.iter()
                .filter(|c| schema.iter().any(|s| s.as_ref() == **c))
                .map(|c| c.to_string())
                .collect()
        };
        Self {
            standardize: present(&[
                "Temperature",
                "Humidity",
                "SquareFootage",
                "Occupancy",
                "RenewableEnergy",
                "Hour",
            ]),
            one_hot: present(&["Season", "Month"]),
        }
    }

    pub fn is_identity(&self) -> bool {
        self.standardize.is_empty() && self.one_hot.is_empty()
    }
}

/// A fitted transform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TransformStage {
    StandardScaler {
        columns: Vec<String>,
        means: Vec<f64>,
        stds: Vec<f64>,
    },
    /// Replaces each column in place by `{column}_{category}` indicators;
    /// unseen categories encode as all zeros.
    OneHotEncoder {
        columns: Vec<String>,
        categories: Vec<Vec<i64>>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedStage {
    pub name: String,
    pub stage: TransformStage,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreprocessingPipeline {
    stages: Vec<NamedStage>,
}

fn column_index(fv: &FeatureVector, name: &str) -> Result<usize, FeatureError> {
    fv.position(name)
        .ok_or_else(|| FeatureError::MissingFeature(name.to_string()))
}

fn column_values(rows: &[FeatureVector], name: &str) -> Result<Vec<f64>, FeatureError> {
    rows.iter()
        .map(|fv| column_index(fv, name).map(|i| fv.features[i]))
        .collect()
}

impl PreprocessingPipeline {
    /// Pipeline that passes vectors through untouched
    pub fn identity() -> Self {
        Self::default()
    }

    /// Fit every stage named in `spec` on the training rows
    pub fn fit(spec: &PipelineSpec, rows: &[FeatureVector]) -> Result<Self, FeatureError> {
        let mut stages = Vec::new();

        if !spec.standardize.is_empty() {
            let mut means = Vec::with_capacity(spec.standardize.len());
            let mut stds = Vec::with_capacity(spec.standardize.len());
            for column in &spec.standardize {
                let values = column_values(rows, column)?;
                let n = values.len().max(1) as f64;
                let mean = values.iter().sum::<f64>() / n;
                let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
                means.push(mean);
                stds.push(variance.sqrt());
            }
            stages.push(NamedStage {
                name: "scaler".to_string(),
                stage: TransformStage::StandardScaler {
                    columns: spec.standardize.clone(),
                    means,
                    stds,
                },
            });
        }

        if !spec.one_hot.is_empty() {
            let mut categories = Vec::with_capacity(spec.one_hot.len());
            for column in &spec.one_hot {
                let mut seen: Vec<i64> = column_values(rows, column)?
                    .into_iter()
                    .map(|v| v.round() as i64)
                    .collect();
                seen.sort_unstable();
                seen.dedup();
                categories.push(seen);
            }
            stages.push(NamedStage {
                name: "onehot".to_string(),
                stage: TransformStage::OneHotEncoder {
                    columns: spec.one_hot.clone(),
                    categories,
                },
            });
        }

        Ok(Self { stages })
    }

    pub fn stages(&self) -> &[NamedStage] {
        &self.stages
    }

    pub fn is_identity(&self) -> bool {
        self.stages.is_empty()
    }

    /// Apply all stages in order
    pub fn transform(&self, input: &FeatureVector) -> Result<FeatureVector, FeatureError> {
        let mut fv = input.clone();

        for named in &self.stages {
            match &named.stage {
                TransformStage::StandardScaler {
                    columns,
                    means,
                    stds,
                } => {
                    let indices = columns
                        .iter()
                        .map(|c| column_index(&fv, c))
                        .collect::<Result<Vec<_>, _>>()?;
                    fv.standardize(&indices, means, stds)?;
                }
                TransformStage::OneHotEncoder {
                    columns,
                    categories,
                } => {
                    for (column, cats) in columns.iter().zip(categories) {
                        let i = column_index(&fv, column)?;
                        let code = fv.features[i].round() as i64;

                        let values: Vec<f64> = cats
                            .iter()
                            .map(|c| if *c == code { 1.0 } else { 0.0 })
                            .collect();
                        let names: Vec<String> =
                            cats.iter().map(|c| format!("{}_{}", column, c)).collect();

                        fv.features.splice(i..=i, values);
                        fv.feature_names.splice(i..=i, names);
                    }
                }
            }
        }

        Ok(fv)
    }

    /// Column names after all stages, given the assembled input names
    pub fn output_names<S: AsRef<str>>(&self, input: &[S]) -> Vec<String> {
        let mut names: Vec<String> = input.iter().map(|s| s.as_ref().to_string()).collect();

        for named in &self.stages {
            if let TransformStage::OneHotEncoder {
                columns,
                categories,
            } = &named.stage
            {
                for (column, cats) in columns.iter().zip(categories) {
                    if let Some(i) = names.iter().position(|n| n == column) {
                        let expanded = cats.iter().map(|c| format!("{}_{}", column, c));
                        names.splice(i..=i, expanded);
                    }
                }
            }
        }

        names
    }
}
