//! Machine Learning Module
//!
//! Model training and inference for building energy consumption:
//! - Training pipeline for offline model fitting
//! - Prediction driver for single records
//! - Named preprocessing stages persisted next to the model
//! - Artifact persistence (model blob, feature list, metadata)
//!
//! Tree-ensemble fitting and inference are delegated to SmartCore.

use serde::{Deserialize, Serialize};

use crate::features::FeatureError;

pub mod artifacts;
pub mod inference;
pub mod models;
pub mod preprocessing;
pub mod smartcore;
pub mod training;

pub use artifacts::{ArtifactStore, ModelArtifact};
pub use inference::{predict_energy, EnergyPredictor, PredictionOutcome};
pub use models::RegressionModel;
pub use preprocessing::{PipelineSpec, PreprocessingPipeline};
pub use self::smartcore::SmartcoreRandomForest;
pub use training::{TrainingConfig, TrainingDataset, TrainingDriver, TrainingReport};

/// ML Model Metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub model_id: String,
    pub algorithm: String,
    pub version: String,
    pub trained_at: chrono::DateTime<chrono::Utc>,
    pub training_samples: usize,
    pub train_metrics: ValidationMetrics,
    /// Held-out split metrics, absent when the model was fit without one
    pub test_metrics: Option<ValidationMetrics>,
    /// Model input columns, i.e. after preprocessing
    pub feature_names: Vec<String>,
}

/// Validation Metrics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidationMetrics {
    pub mae: f64,  // Mean Absolute Error
    pub rmse: f64, // Root Mean Square Error
    pub mape: f64, // Mean Absolute Percentage Error
    pub r2: f64,   // Coefficient of determination
}

impl ValidationMetrics {
    pub fn new(mae: f64, rmse: f64, mape: f64, r2: f64) -> Self {
        Self { mae, rmse, mape, r2 }
    }
}

/// Feature Vector for ML models
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub features: Vec<f64>,
    pub feature_names: Vec<String>,
}

impl FeatureVector {
    pub fn new(features: Vec<f64>, feature_names: Vec<String>) -> Result<Self, FeatureError> {
        if features.len() != feature_names.len() {
            return Err(FeatureError::LengthMismatch {
                values: features.len(),
                names: feature_names.len(),
            });
        }
        Ok(Self {
            features,
            feature_names,
        })
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.position(name).map(|i| self.features[i])
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.feature_names.iter().position(|n| n == name)
    }

    /// Z-score the columns at `indices` in place.
    ///
    /// A (near) zero standard deviation maps the column to 0.
    pub fn standardize(
        &mut self,
        indices: &[usize],
        means: &[f64],
        stds: &[f64],
    ) -> Result<(), FeatureError> {
        if means.len() != indices.len() || stds.len() != indices.len() {
            return Err(FeatureError::LengthMismatch {
                values: indices.len(),
                names: means.len().min(stds.len()),
            });
        }

        for ((&i, mean), std) in indices.iter().zip(means).zip(stds) {
            let f = self.features[i];
            self.features[i] = if std.abs() < 1e-10 { 0.0 } else { (f - mean) / std };
        }
        Ok(())
    }
}

/// ML Prediction Result
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub value: f64,
}

impl Prediction {
    pub fn new(value: f64) -> Self {
        Self { value }
    }

    /// Value rounded to two decimals
    pub fn rounded(&self) -> f64 {
        (self.value * 100.0).round() / 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: &[&str]) -> Vec<String> {
        n.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_feature_vector_creation() {
        let fv = FeatureVector::new(vec![1.0, 2.0, 3.0], names(&["f1", "f2", "f3"])).unwrap();
        assert_eq!(fv.len(), 3);
        assert!(!fv.is_empty());
        assert_eq!(fv.get("f2"), Some(2.0));
        assert_eq!(fv.get("f4"), None);
    }

    #[test]
    fn test_feature_vector_length_mismatch() {
        let err = FeatureVector::new(vec![1.0], names(&["f1", "f2"])).unwrap_err();
        assert_eq!(err, FeatureError::LengthMismatch { values: 1, names: 2 });
    }

    #[test]
    fn test_feature_vector_standardize() {
        let mut fv = FeatureVector::new(vec![10.0, 20.0, 30.0], names(&["f1", "f2", "f3"])).unwrap();

        fv.standardize(&[0, 2], &[6.0, 30.0], &[2.0, 0.0]).unwrap();
        assert_eq!(fv.features, vec![2.0, 20.0, 0.0]); // (10-6)/2, untouched, zero std
    }

    #[test]
    fn test_prediction_rounding() {
        assert_eq!(Prediction::new(42.4567).rounded(), 42.46);
        assert_eq!(Prediction::new(42.0).rounded(), 42.0);
        assert_eq!(Prediction::new(-1.234).rounded(), -1.23);
    }
}
