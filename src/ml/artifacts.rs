//! Persisted training artifacts
//!
//! One directory holds everything prediction needs:
//! - `energy_model.bin`: bincode blob of the forest and fitted preprocessing
//! - `features.txt`: comma-separated feature names in training order
//! - `model_metadata.json`: human-readable metadata and scores

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{preprocessing::PreprocessingPipeline, smartcore::SmartcoreRandomForest, ModelMetadata};
use crate::error::ForecastError;

pub const MODEL_FILE: &str = "energy_model.bin";
pub const FEATURES_FILE: &str = "features.txt";
pub const METADATA_FILE: &str = "model_metadata.json";

/// Fitted model plus the preprocessing it was trained behind
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub model: SmartcoreRandomForest,
    pub pipeline: PreprocessingPipeline,
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn model_path(&self) -> PathBuf {
        self.dir.join(MODEL_FILE)
    }

    pub fn features_path(&self) -> PathBuf {
        self.dir.join(FEATURES_FILE)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.dir.join(METADATA_FILE)
    }

    /// Write the model, the feature list and the metadata
    pub fn save(
        &self,
        artifact: &mut ModelArtifact,
        feature_names: &[String],
    ) -> Result<(), ForecastError> {
        fs::create_dir_all(&self.dir).map_err(|e| ForecastError::io(&self.dir, e))?;
        self.save_model(artifact)?;
        self.save_feature_names(feature_names)?;
        self.save_metadata(&artifact.model.metadata)
    }

    pub fn save_model(&self, artifact: &mut ModelArtifact) -> Result<(), ForecastError> {
        artifact
            .model
            .prepare_for_serialization()
            .map_err(|e| ForecastError::Artifact(format!("{:#}", e)))?;
        let bytes = bincode::serialize(artifact)
            .map_err(|e| ForecastError::Artifact(format!("failed to encode model: {}", e)))?;

        let path = self.model_path();
        fs::write(&path, &bytes).map_err(|e| ForecastError::io(&path, e))?;
        debug!(path = %path.display(), bytes = bytes.len(), "model written");
        Ok(())
    }

    pub fn load_model(&self) -> Result<ModelArtifact, ForecastError> {
        let path = self.model_path();
        let bytes = fs::read(&path).map_err(|e| ForecastError::io(&path, e))?;

        let mut artifact: ModelArtifact = bincode::deserialize(&bytes)
            .map_err(|e| ForecastError::Artifact(format!("failed to decode {}: {}", path.display(), e)))?;
        artifact
            .model
            .restore_from_serialization()
            .map_err(|e| ForecastError::Artifact(format!("{:#}", e)))?;
        Ok(artifact)
    }

    pub fn save_feature_names(&self, names: &[String]) -> Result<(), ForecastError> {
        if let Some(bad) = names.iter().find(|n| n.is_empty() || n.contains(',')) {
            return Err(ForecastError::Artifact(format!(
                "feature name '{}' cannot be stored in {}",
                bad, FEATURES_FILE
            )));
        }

        let path = self.features_path();
        fs::write(&path, names.join(",")).map_err(|e| ForecastError::io(&path, e))
    }

    /// Read the training-order feature list back, order preserved
    pub fn load_feature_names(&self) -> Result<Vec<String>, ForecastError> {
        let path = self.features_path();
        let raw = fs::read_to_string(&path).map_err(|e| ForecastError::io(&path, e))?;

        let names: Vec<String> = raw.trim().split(',').map(|n| n.trim().to_string()).collect();
        if names.iter().any(String::is_empty) {
            return Err(ForecastError::Artifact(format!(
                "{} contains an empty feature name",
                path.display()
            )));
        }
        Ok(names)
    }

    pub fn save_metadata(&self, metadata: &ModelMetadata) -> Result<(), ForecastError> {
        let json = serde_json::to_string_pretty(metadata)
            .map_err(|e| ForecastError::Artifact(format!("failed to encode metadata: {}", e)))?;
        let path = self.metadata_path();
        fs::write(&path, json).map_err(|e| ForecastError::io(&path, e))
    }

    pub fn load_metadata(&self) -> Result<ModelMetadata, ForecastError> {
        let path = self.metadata_path();
        let raw = fs::read_to_string(&path).map_err(|e| ForecastError::io(&path, e))?;
        serde_json::from_str(&raw)
            .map_err(|e| ForecastError::Artifact(format!("failed to decode {}: {}", path.display(), e)))
    }
}
