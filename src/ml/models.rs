//! ML Model Definitions

use super::{FeatureVector, ModelMetadata, Prediction};
use anyhow::Result;

/// A fitted regression model.
///
/// Inference is positional: `features` must follow the column order in
/// [`ModelMetadata::feature_names`].
pub trait RegressionModel: Send + Sync {
    /// Predict a value from features
    fn predict(&self, features: &FeatureVector) -> Result<Prediction>;

    /// Get model metadata
    fn metadata(&self) -> &ModelMetadata;
}

