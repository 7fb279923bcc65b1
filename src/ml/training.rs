//! ML Model Training Pipeline
//!
//! Offline training: load the CSV, derive and assemble features, split,
//! fit preprocessing and the forest, score, persist.

use std::path::Path;

use anyhow::{Context, Result};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use validator::Validate;

use super::{
    artifacts::{ArtifactStore, ModelArtifact},
    preprocessing::{PipelineSpec, PreprocessingPipeline},
    smartcore::{ForestParams, SmartcoreRandomForest},
    FeatureVector, ValidationMetrics,
};
use crate::data;
use crate::features::{assemble, derive_record_features, FeatureError, FeatureSchema};

/// Training Dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingDataset {
    pub features: Vec<FeatureVector>,
    pub targets: Vec<f64>,
}

impl TrainingDataset {
    pub fn new(features: Vec<FeatureVector>, targets: Vec<f64>) -> Result<Self> {
        if features.len() != targets.len() {
            anyhow::bail!(
                "Feature and target count mismatch: {} features, {} targets",
                features.len(),
                targets.len()
            );
        }
        Ok(Self { features, targets })
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Shuffle with a seeded RNG and hold out `test_ratio` of the rows.
    ///
    /// The held-out size is rounded up; both splits are non-empty.
    pub fn split(&self, test_ratio: f64, seed: u64) -> Result<(TrainingDataset, TrainingDataset)> {
        if test_ratio <= 0.0 || test_ratio >= 1.0 {
            anyhow::bail!("Test ratio must be between 0 and 1, got {}", test_ratio);
        }
        if self.len() < 2 {
            anyhow::bail!("Need at least 2 samples to split, got {}", self.len());
        }

        let mut indices: Vec<usize> = (0..self.len()).collect();
        let mut rng = StdRng::seed_from_u64(seed);
        indices.shuffle(&mut rng);

        let n_test = ((self.len() as f64 * test_ratio).ceil() as usize).clamp(1, self.len() - 1);
        let (test_idx, train_idx) = indices.split_at(n_test);

        Ok((self.subset(train_idx), self.subset(test_idx)))
    }

    fn subset(&self, indices: &[usize]) -> TrainingDataset {
        TrainingDataset {
            features: indices.iter().map(|&i| self.features[i].clone()).collect(),
            targets: indices.iter().map(|&i| self.targets[i]).collect(),
        }
    }

    fn rows(&self) -> Vec<Vec<f64>> {
        self.features.iter().map(|f| f.features.clone()).collect()
    }
}

/// Calculate validation metrics
pub fn calculate_metrics(predictions: &[f64], targets: &[f64]) -> Result<ValidationMetrics> {
    if predictions.len() != targets.len() {
        anyhow::bail!("Prediction and target count mismatch");
    }

    if predictions.is_empty() {
        anyhow::bail!("No predictions to evaluate");
    }

    let n = predictions.len() as f64;

    // Mean Absolute Error
    let mae: f64 = predictions
        .iter()
        .zip(targets.iter())
        .map(|(p, t)| (p - t).abs())
        .sum::<f64>()
        / n;

    // Root Mean Square Error
    let mse: f64 = predictions
        .iter()
        .zip(targets.iter())
        .map(|(p, t)| (p - t).powi(2))
        .sum::<f64>()
        / n;
    let rmse = mse.sqrt();

    // Mean Absolute Percentage Error
    let nonzero: Vec<f64> = predictions
        .iter()
        .zip(targets.iter())
        .filter(|(_, t)| t.abs() > 1e-10) // Avoid division by zero
        .map(|(p, t)| ((p - t) / t).abs() * 100.0)
        .collect();
    let mape = if nonzero.is_empty() {
        0.0
    } else {
        nonzero.iter().sum::<f64>() / nonzero.len() as f64
    };

    // R-squared
    let mean_target: f64 = targets.iter().sum::<f64>() / n;
    let ss_tot: f64 = targets.iter().map(|t| (t - mean_target).powi(2)).sum();
    let ss_res: f64 = predictions
        .iter()
        .zip(targets.iter())
        .map(|(p, t)| (t - p).powi(2))
        .sum();

    let r2 = if ss_tot.abs() < 1e-10 {
        0.0
    } else {
        1.0 - (ss_res / ss_tot)
    };

    Ok(ValidationMetrics::new(mae, rmse, mape, r2))
}

/// Training Configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Fraction of rows held out for the test score
    pub test_split: f64,
    /// Seed for the split and the forest
    pub seed: u64,
    pub n_trees: usize,
    pub max_depth: Option<u16>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        let forest = ForestParams::default();
        Self {
            test_split: 0.2,
            seed: forest.seed,
            n_trees: forest.n_trees,
            max_depth: forest.max_depth,
            min_samples_split: forest.min_samples_split,
            min_samples_leaf: forest.min_samples_leaf,
        }
    }
}

impl TrainingConfig {
    pub fn forest_params(&self) -> ForestParams {
        ForestParams {
            n_trees: self.n_trees,
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
            seed: self.seed,
        }
    }
}

/// Goodness of fit of a finished run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingReport {
    pub model_id: String,
    pub samples: usize,
    pub train: ValidationMetrics,
    pub test: ValidationMetrics,
    /// Persisted feature-name list, in training order
    pub feature_names: Vec<String>,
}

/// Model Trainer
///
/// Every failure here aborts the run; training is an offline batch job.
pub struct TrainingDriver {
    config: TrainingConfig,
    schema: FeatureSchema,
    preprocessing: PipelineSpec,
}

impl TrainingDriver {
    pub fn new(config: TrainingConfig, schema: FeatureSchema, preprocessing: PipelineSpec) -> Self {
        Self {
            config,
            schema,
            preprocessing,
        }
    }

    /// Validate, derive and assemble every record; each must carry the target.
    ///
    /// Rows are held to the same rules as prediction requests.
    pub fn build_dataset(&self, records: &[crate::domain::RawRecord]) -> Result<TrainingDataset> {
        self.check_schema()?;
        let names = self.schema.names();
        let mut features = Vec::with_capacity(records.len());
        let mut targets = Vec::with_capacity(records.len());

        for (row, record) in records.iter().enumerate() {
            let target = record
                .energy_consumption
                .ok_or(FeatureError::MissingTarget(row))?;
            record
                .validate()
                .with_context(|| format!("validating row {}", row))?;
            let derived = derive_record_features(record)
                .with_context(|| format!("deriving features for row {}", row))?;
            let fv = assemble(&derived, &names)
                .with_context(|| format!("assembling features for row {}", row))?;
            features.push(fv);
            targets.push(target);
        }

        TrainingDataset::new(features, targets)
    }

    /// Fit on an in-memory dataset
    pub fn fit(&self, dataset: &TrainingDataset) -> Result<(ModelArtifact, TrainingReport)> {
        self.check_schema()?;

        let (train, test) = dataset.split(self.config.test_split, self.config.seed)?;
        info!(train = train.len(), test = test.len(), "split dataset");

        let pipeline = PreprocessingPipeline::fit(&self.preprocessing, &train.features)
            .context("fitting preprocessing pipeline")?;
        let train = self.transform(&pipeline, &train)?;
        let test = self.transform(&pipeline, &test)?;

        let model_names = pipeline.output_names(&self.schema.names());
        debug!(features = ?model_names, "model input columns");

        let mut model = SmartcoreRandomForest::train(
            &train.rows(),
            &train.targets,
            self.config.forest_params(),
            model_names,
        )?;

        let test_predictions = model.predict_rows(&test.rows())?;
        let test_metrics = calculate_metrics(&test_predictions, &test.targets)?;
        model.set_test_metrics(test_metrics);

        let report = TrainingReport {
            model_id: model.metadata.model_id.clone(),
            samples: dataset.len(),
            train: model.metadata.train_metrics,
            test: test_metrics,
            feature_names: self.schema.names(),
        };
        info!(
            model_id = %report.model_id,
            train_r2 = report.train.r2,
            test_r2 = report.test.r2,
            "model trained"
        );

        Ok((ModelArtifact { model, pipeline }, report))
    }

    /// Full run: CSV in, persisted artifacts out
    pub fn run(&self, data_path: &Path, store: &ArtifactStore) -> Result<TrainingReport> {
        let records = data::load_records(data_path)
            .with_context(|| format!("loading training data from {}", data_path.display()))?;
        info!(rows = records.len(), path = %data_path.display(), "loaded training data");

        let dataset = self.build_dataset(&records)?;
        let (mut artifact, report) = self.fit(&dataset)?;

        store
            .save(&mut artifact, &report.feature_names)
            .with_context(|| format!("writing artifacts to {}", store.dir().display()))?;
        info!(dir = %store.dir().display(), "artifacts saved");

        Ok(report)
    }

    fn check_schema(&self) -> Result<()> {
        self.schema
            .ensure_record_derivable()
            .context("feature schema cannot be reproduced at prediction time")
    }

    fn transform(
        &self,
        pipeline: &PreprocessingPipeline,
        dataset: &TrainingDataset,
    ) -> Result<TrainingDataset> {
        let features = dataset
            .features
            .iter()
            .map(|fv| pipeline.transform(fv))
            .collect::<Result<Vec<_>, _>>()?;
        TrainingDataset::new(features, dataset.targets.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RawRecord;

    fn fv(values: &[f64]) -> FeatureVector {
        let names = (0..values.len()).map(|i| format!("f{}", i)).collect();
        FeatureVector::new(values.to_vec(), names).unwrap()
    }

    fn dataset(n: usize) -> TrainingDataset {
        let features = (0..n).map(|i| fv(&[i as f64, (i * 2) as f64])).collect();
        let targets = (0..n).map(|i| i as f64 * 3.0).collect();
        TrainingDataset::new(features, targets).unwrap()
    }

    fn record(i: usize) -> RawRecord {
        let days = ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday"];
        let hour = i % 24;
        let hvac = if (8..=18).contains(&hour) { "On" } else { "Off" };
        let temperature = 15.0 + (i % 15) as f64;
        RawRecord {
            timestamp: Some(format!("{:02}-03-2022 {:02}:00", 1 + (i / 24) % 28, hour)),
            temperature,
            humidity: 30.0 + (i % 20) as f64,
            square_footage: 1000 + (i % 5) as i64 * 250,
            occupancy: (i % 8) as i64,
            hvac_usage: hvac.to_string(),
            lighting_usage: if i % 3 == 0 { "On" } else { "Off" }.to_string(),
            renewable_energy: (i % 10) as f64,
            day_of_week: days[(i / 24) % 7].to_string(),
            holiday: if i % 17 == 0 { "Yes" } else { "No" }.to_string(),
            energy_consumption: Some(50.0 + temperature * 1.5 + if hvac == "On" { 20.0 } else { 0.0 }),
        }
    }

    #[test]
    fn test_dataset_split_sizes() {
        let (train, test) = dataset(10).split(0.2, 42).unwrap();
        assert_eq!(train.len(), 8);
        assert_eq!(test.len(), 2);

        let (train, test) = dataset(7).split(0.2, 42).unwrap();
        assert_eq!(train.len() + test.len(), 7);
        assert_eq!(test.len(), 2); // ceil(1.4)
    }

    #[test]
    fn test_dataset_split_is_reproducible() {
        let data = dataset(50);
        let (a_train, a_test) = data.split(0.2, 42).unwrap();
        let (b_train, b_test) = data.split(0.2, 42).unwrap();
        assert_eq!(a_train.targets, b_train.targets);
        assert_eq!(a_test.targets, b_test.targets);

        let (c_train, _) = data.split(0.2, 7).unwrap();
        assert_ne!(a_train.targets, c_train.targets);
    }

    #[test]
    fn test_dataset_split_keeps_rows_paired() {
        let (train, test) = dataset(20).split(0.25, 1).unwrap();
        for split in [&train, &test] {
            for (f, t) in split.features.iter().zip(&split.targets) {
                assert_eq!(f.features[0] * 3.0, *t);
            }
        }
    }

    #[test]
    fn test_dataset_split_rejects_bad_ratio() {
        assert!(dataset(10).split(0.0, 42).is_err());
        assert!(dataset(10).split(1.0, 42).is_err());
        assert!(dataset(1).split(0.2, 42).is_err());
    }

    #[test]
    fn test_calculate_metrics() {
        let predictions = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let targets = vec![1.1, 2.1, 2.9, 4.2, 4.8];

        let metrics = calculate_metrics(&predictions, &targets).unwrap();

        assert!(metrics.mae < 0.3);
        assert!(metrics.rmse < 0.4);
        assert!(metrics.r2 > 0.9);
    }

    #[test]
    fn test_calculate_metrics_perfect_fit() {
        let values = vec![3.0, 5.0, 7.0];
        let metrics = calculate_metrics(&values, &values).unwrap();
        assert_eq!(metrics.r2, 1.0);
        assert_eq!(metrics.mae, 0.0);
    }

    #[test]
    fn test_build_dataset_requires_target() {
        let driver = TrainingDriver::new(
            TrainingConfig::default(),
            FeatureSchema::baseline(),
            PipelineSpec::default(),
        );
        let mut records = vec![record(0), record(1)];
        records[1].energy_consumption = None;

        let err = driver.build_dataset(&records).unwrap_err();
        assert_eq!(
            err.downcast_ref::<FeatureError>(),
            Some(&FeatureError::MissingTarget(1))
        );
    }

    #[test]
    fn test_build_dataset_rejects_unknown_category() {
        let driver = TrainingDriver::new(
            TrainingConfig::default(),
            FeatureSchema::baseline(),
            PipelineSpec::default(),
        );
        let mut records = vec![record(0)];
        records[0].hvac_usage = "Auto".to_string();

        let err = driver.build_dataset(&records).unwrap_err();
        assert!(format!("{:#}", err).contains("invalid value 'Auto' for HVACUsage"));
    }

    #[test]
    fn test_build_dataset_rejects_invalid_record() {
        let driver = TrainingDriver::new(
            TrainingConfig::default(),
            FeatureSchema::baseline(),
            PipelineSpec::default(),
        );
        let mut records: Vec<RawRecord> = (0..4).map(record).collect();
        records[2].square_footage = 0;

        let err = driver.build_dataset(&records).unwrap_err();
        assert_eq!(err.to_string(), "validating row 2");
        assert!(err.downcast_ref::<validator::ValidationErrors>().is_some());

        records[2].square_footage = 1200;
        records[3].occupancy = -1;
        let err = driver.build_dataset(&records).unwrap_err();
        assert!(format!("{:#}", err).contains("occupancy cannot be negative"));
    }

    #[test]
    fn test_fit_reports_both_scores() {
        let config = TrainingConfig {
            n_trees: 10,
            ..TrainingConfig::default()
        };
        let driver = TrainingDriver::new(config, FeatureSchema::baseline(), PipelineSpec::default());
        let records: Vec<RawRecord> = (0..120).map(record).collect();

        let dataset = driver.build_dataset(&records).unwrap();
        let (artifact, report) = driver.fit(&dataset).unwrap();

        assert_eq!(report.samples, 120);
        assert_eq!(report.feature_names, FeatureSchema::baseline().names());
        assert!(report.train.r2 > 0.5);
        assert!(report.test.r2.is_finite());
        assert_eq!(artifact.model.metadata.test_metrics, Some(report.test));
    }

    #[test]
    fn test_fit_with_preprocessing_expands_model_columns() {
        let config = TrainingConfig {
            n_trees: 5,
            ..TrainingConfig::default()
        };
        let schema = FeatureSchema::extended();
        let spec = PipelineSpec::standard(&schema.names());
        let driver = TrainingDriver::new(config, schema.clone(), spec);
        let records: Vec<RawRecord> = (0..60).map(record).collect();

        let dataset = driver.build_dataset(&records).unwrap();
        let (artifact, report) = driver.fit(&dataset).unwrap();

        assert_eq!(report.feature_names, schema.names());
        let model_names = &artifact.model.metadata.feature_names;
        assert!(model_names.contains(&"Month_3".to_string()));
        assert!(model_names.contains(&"Season_1".to_string()));
        assert!(!model_names.contains(&"Month".to_string()));
    }

    #[test]
    fn test_fit_rejects_series_schema() {
        let schema = FeatureSchema::from_names(&["Temperature", "EnergyConsumption_lag_1"]).unwrap();
        let driver = TrainingDriver::new(TrainingConfig::default(), schema, PipelineSpec::default());

        let err = driver.fit(&dataset(10)).unwrap_err();
        assert!(format!("{:#}", err).contains("EnergyConsumption_lag_1"));
    }
}
