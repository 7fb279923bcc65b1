//! SmartCore ML Model Wrapper
//!
//! Wraps SmartCore's RandomForestRegressor, the tree ensemble that predicts
//! building energy consumption.

use super::{FeatureVector, ModelMetadata, Prediction, ValidationMetrics};
use anyhow::Result;
use serde::{Deserialize, Serialize};

use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;

type Forest = RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

pub const ALGORITHM: &str = "smartcore_random_forest";

/// Forest hyperparameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: Option<u16>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub seed: u64,
}

impl Default for ForestParams {
    /// 50 trees of depth 10, seeded for reproducible fits
    fn default() -> Self {
        Self {
            n_trees: 50,
            max_depth: Some(10),
            min_samples_split: 2,
            min_samples_leaf: 1,
            seed: 42,
        }
    }
}

impl ForestParams {
    pub fn to_smartcore(&self) -> RandomForestRegressorParameters {
        RandomForestRegressorParameters {
            max_depth: self.max_depth,
            min_samples_leaf: self.min_samples_leaf,
            min_samples_split: self.min_samples_split,
            n_trees: self.n_trees,
            m: None, // Use sqrt(n_features) by default
            keep_samples: false, // Don't store training samples (saves memory)
            seed: self.seed,
        }
    }
}

/// SmartCore RandomForest Model Wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct SmartcoreRandomForest {
    pub metadata: ModelMetadata,
    #[serde(skip)]
    model: Option<Forest>,
    /// Serialized model bytes (for persistence)
    model_bytes: Option<Vec<u8>>,
    /// Training parameters for reproducibility
    pub params: ForestParams,
}

/// Row-major feature rows as a SmartCore matrix
pub(crate) fn to_matrix(x: &[Vec<f64>]) -> Result<DenseMatrix<f64>> {
    let n_samples = x.len();
    let n_features = x.first().map(Vec::len).unwrap_or(0);

    let mut flat_data = Vec::with_capacity(n_samples * n_features);
    for row in x {
        if row.len() != n_features {
            anyhow::bail!("All feature vectors must have the same length");
        }
        flat_data.extend_from_slice(row);
    }

    Ok(DenseMatrix::new(n_samples, n_features, flat_data, false))
}

impl SmartcoreRandomForest {
    /// Train a new RandomForest model
    pub fn train(
        x: &[Vec<f64>],
        y: &[f64],
        params: ForestParams,
        feature_names: Vec<String>,
    ) -> Result<Self> {
        if x.is_empty() || y.is_empty() {
            anyhow::bail!("Cannot train on empty dataset");
        }

        if x.len() != y.len() {
            anyhow::bail!(
                "Feature and target count mismatch: {} features, {} targets",
                x.len(),
                y.len()
            );
        }

        if x[0].len() != feature_names.len() {
            anyhow::bail!(
                "Feature name count mismatch: {} columns, {} names",
                x[0].len(),
                feature_names.len()
            );
        }

        let x_matrix = to_matrix(x)?;
        let y_vec = y.to_vec();

        let model = RandomForestRegressor::fit(&x_matrix, &y_vec, params.to_smartcore())
            .map_err(|e| anyhow::anyhow!("RandomForest training failed: {:?}", e))?;

        let predictions = model
            .predict(&x_matrix)
            .map_err(|e| anyhow::anyhow!("Prediction failed during validation: {:?}", e))?;
        let train_metrics = super::training::calculate_metrics(&predictions, y)?;

        let metadata = ModelMetadata {
            model_id: format!("energy_rf_{}", uuid::Uuid::new_v4()),
            algorithm: ALGORITHM.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            trained_at: chrono::Utc::now(),
            training_samples: x.len(),
            train_metrics,
            test_metrics: None,
            feature_names,
        };

        Ok(Self {
            metadata,
            model: Some(model),
            model_bytes: None,
            params,
        })
    }

    /// Predict a batch of rows
    pub fn predict_rows(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Model not loaded"))?;

        if x.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(row) = x.iter().find(|row| row.len() != self.metadata.feature_names.len()) {
            anyhow::bail!(
                "Feature count mismatch: expected {}, got {}",
                self.metadata.feature_names.len(),
                row.len()
            );
        }

        model
            .predict(&to_matrix(x)?)
            .map_err(|e| anyhow::anyhow!("Prediction failed: {:?}", e))
    }

    /// Record the held-out split score
    pub fn set_test_metrics(&mut self, metrics: ValidationMetrics) {
        self.metadata.test_metrics = Some(metrics);
    }

    /// Prepare model for serialization
    pub fn prepare_for_serialization(&mut self) -> Result<()> {
        if let Some(model) = &self.model {
            let bytes = bincode::serialize(model)
                .map_err(|e| anyhow::anyhow!("Failed to serialize model: {}", e))?;
            self.model_bytes = Some(bytes);
        }
        Ok(())
    }

    /// Restore model from serialized bytes
    pub fn restore_from_serialization(&mut self) -> Result<()> {
        let bytes = self
            .model_bytes
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Model artifact carries no forest"))?;
        let model: Forest = bincode::deserialize(bytes)
            .map_err(|e| anyhow::anyhow!("Failed to deserialize model: {}", e))?;
        self.model = Some(model);
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.model.is_some()
    }
}

impl super::models::RegressionModel for SmartcoreRandomForest {
    fn predict(&self, features: &FeatureVector) -> Result<Prediction> {
        if features.feature_names != self.metadata.feature_names {
            anyhow::bail!(
                "Feature layout does not match the trained model: expected [{}], got [{}]",
                self.metadata.feature_names.join(","),
                features.feature_names.join(",")
            );
        }

        let predictions = self.predict_rows(std::slice::from_ref(&features.features))?;
        let value = predictions
            .first()
            .copied()
            .ok_or_else(|| anyhow::anyhow!("Model returned empty predictions"))?;

        if !value.is_finite() {
            anyhow::bail!("Invalid prediction: non-finite value {}", value);
        }

        Ok(Prediction::new(value))
    }

    fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }
}
