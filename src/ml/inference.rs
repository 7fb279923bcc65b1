//! ML Model Inference Engine
//!
//! Prediction for single raw records. [`EnergyPredictor`] is the recovery
//! boundary of the prediction path: every failure is reported in a
//! [`PredictionOutcome`], never propagated to the caller.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use validator::Validate;

use super::{
    artifacts::ArtifactStore, models::RegressionModel, preprocessing::PreprocessingPipeline,
    ModelMetadata, Prediction,
};
use crate::domain::RawRecord;
use crate::error::ForecastError;
use crate::features::{assemble, derive_record_features, FeatureSchema};

/// Result of one prediction call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicted_energy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PredictionOutcome {
    pub fn succeeded(predicted_energy: f64) -> Self {
        Self {
            success: true,
            predicted_energy: Some(predicted_energy),
            error: None,
        }
    }

    pub fn failed(error: impl ToString) -> Self {
        Self {
            success: false,
            predicted_energy: None,
            error: Some(error.to_string()),
        }
    }
}

impl From<Result<f64, ForecastError>> for PredictionOutcome {
    fn from(result: Result<f64, ForecastError>) -> Self {
        match result {
            Ok(value) => Self::succeeded(value),
            Err(e) => Self::failed(e),
        }
    }
}

/// Loaded model, preprocessing and feature order, ready to serve
pub struct EnergyPredictor {
    model: Box<dyn RegressionModel>,
    pipeline: PreprocessingPipeline,
    feature_names: Vec<String>,
}

impl std::fmt::Debug for EnergyPredictor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnergyPredictor")
            .field("model_id", &self.model.metadata().model_id)
            .field("feature_names", &self.feature_names)
            .finish()
    }
}

impl EnergyPredictor {
    /// Check that the feature list can be derived from one record and that,
    /// after preprocessing, it lines up with the model's input columns.
    pub fn new(
        model: Box<dyn RegressionModel>,
        pipeline: PreprocessingPipeline,
        feature_names: Vec<String>,
    ) -> Result<Self, ForecastError> {
        FeatureSchema::from_names(&feature_names)?.ensure_record_derivable()?;

        let expected = pipeline.output_names(&feature_names);
        if expected != model.metadata().feature_names {
            return Err(ForecastError::Artifact(format!(
                "feature list [{}] does not match model inputs [{}]",
                expected.join(","),
                model.metadata().feature_names.join(",")
            )));
        }

        Ok(Self {
            model,
            pipeline,
            feature_names,
        })
    }

    /// Load model, pipeline and feature list from an artifact directory
    pub fn load(store: &ArtifactStore) -> Result<Self, ForecastError> {
        let artifact = store.load_model()?;
        let feature_names = store.load_feature_names()?;
        debug!(
            model_id = %artifact.model.metadata.model_id,
            features = feature_names.len(),
            "loaded model artifacts"
        );
        Self::new(Box::new(artifact.model), artifact.pipeline, feature_names)
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn metadata(&self) -> &ModelMetadata {
        self.model.metadata()
    }

    /// Predict, propagating the first failure
    pub fn try_predict(&self, record: &RawRecord) -> Result<f64, ForecastError> {
        record.validate()?;

        let derived = derive_record_features(record)?;
        let assembled = assemble(&derived, &self.feature_names)?;
        let input = self.pipeline.transform(&assembled)?;
        debug!(features = ?input.features, "assembled model input");

        let prediction: Prediction = self
            .model
            .predict(&input)
            .map_err(|e| ForecastError::Model(format!("{:#}", e)))?;

        if !prediction.value.is_finite() {
            return Err(ForecastError::Model(format!(
                "model returned non-finite value {}",
                prediction.value
            )));
        }

        Ok(prediction.rounded())
    }

    /// Predict one record; failures come back as `success: false`
    pub fn predict(&self, record: &RawRecord) -> PredictionOutcome {
        let result = self.try_predict(record);
        if let Err(e) = &result {
            warn!(error = %e, "prediction failed");
        }
        result.into()
    }
}

/// Load the artifacts and predict a single record.
///
/// Artifact loading failures are reported like any other prediction failure.
/// Long-lived callers should load an [`EnergyPredictor`] once instead.
pub fn predict_energy(store: &ArtifactStore, record: &RawRecord) -> PredictionOutcome {
    match EnergyPredictor::load(store) {
        Ok(predictor) => predictor.predict(record),
        Err(e) => {
            warn!(error = %e, dir = %store.dir().display(), "failed to load model artifacts");
            PredictionOutcome::failed(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::{FeatureVector, ValidationMetrics};
    use anyhow::Result;

    /// Weighted sum of the inputs
    struct LinearStub {
        metadata: ModelMetadata,
        weights: Vec<f64>,
    }

    impl LinearStub {
        fn new(feature_names: Vec<String>, weights: Vec<f64>) -> Self {
            Self {
                metadata: ModelMetadata {
                    model_id: "stub".to_string(),
                    algorithm: "linear_stub".to_string(),
                    version: "0.0.0".to_string(),
                    trained_at: chrono::Utc::now(),
                    training_samples: 0,
                    train_metrics: ValidationMetrics::new(0.0, 0.0, 0.0, 1.0),
                    test_metrics: None,
                    feature_names,
                },
                weights,
            }
        }
    }

    impl RegressionModel for LinearStub {
        fn predict(&self, features: &FeatureVector) -> Result<Prediction> {
            Ok(Prediction::new(
                features.features.iter().zip(&self.weights).map(|(f, w)| f * w).sum(),
            ))
        }

        fn metadata(&self) -> &ModelMetadata {
            &self.metadata
        }
    }

    struct FailingModel(ModelMetadata);

    impl RegressionModel for FailingModel {
        fn predict(&self, _features: &FeatureVector) -> Result<Prediction> {
            anyhow::bail!("forest exploded")
        }

        fn metadata(&self) -> &ModelMetadata {
            &self.0
        }
    }

    fn baseline_predictor(weights: Vec<f64>) -> EnergyPredictor {
        let names = FeatureSchema::baseline().names();
        EnergyPredictor::new(
            Box::new(LinearStub::new(names.clone(), weights)),
            PreprocessingPipeline::identity(),
            names,
        )
        .unwrap()
    }

    fn reference_record() -> RawRecord {
        serde_json::from_value(serde_json::json!({
            "Timestamp": "01-01-2022 10:00",
            "Temperature": 22.5,
            "Humidity": 40.0,
            "SquareFootage": 1500,
            "Occupancy": 3,
            "HVACUsage": "On",
            "LightingUsage": "Off",
            "RenewableEnergy": 5.0,
            "DayOfWeek": "Saturday",
            "Holiday": "No"
        }))
        .unwrap()
    }

    #[test]
    fn test_reference_record_predicts() {
        // Temperature, Humidity, SquareFootage, Occupancy, HVACUsage,
        // LightingUsage, RenewableEnergy, DayOfWeek, Holiday, Hour, Month
        let weights = vec![1.0, 0.1, 0.001, 2.0, 10.0, 5.0, -1.0, 0.5, 3.0, 0.25, 1.0];
        let predictor = baseline_predictor(weights);

        let outcome = predictor.predict(&reference_record());
        // 22.5 + 4 + 1.5 + 6 + 10 + 0 - 5 + 2.5 + 0 + 2.5 + 1
        assert_eq!(outcome, PredictionOutcome::succeeded(45.0));
    }

    #[test]
    fn test_prediction_is_rounded() {
        let mut weights = vec![0.0; 11];
        weights[0] = 1.0 / 3.0;
        let predictor = baseline_predictor(weights);

        let outcome = predictor.predict(&reference_record());
        assert_eq!(outcome.predicted_energy, Some(7.5));

        let mut record = reference_record();
        record.temperature = 10.0;
        assert_eq!(predictor.predict(&record).predicted_energy, Some(3.33));
    }

    #[test]
    fn test_unknown_weekday_is_reported() {
        let predictor = baseline_predictor(vec![1.0; 11]);
        let mut record = reference_record();
        record.day_of_week = "Funday".to_string();

        let outcome = predictor.predict(&record);
        assert!(!outcome.success);
        assert!(outcome.predicted_energy.is_none());
        assert_eq!(outcome.error.as_deref(), Some("invalid value 'Funday' for DayOfWeek"));
    }

    #[test]
    fn test_missing_timestamp_is_reported() {
        let predictor = baseline_predictor(vec![1.0; 11]);
        let mut record = reference_record();
        record.timestamp = None;

        let outcome = predictor.predict(&record);
        assert_eq!(outcome, PredictionOutcome::failed("missing feature: Hour"));
    }

    #[test]
    fn test_malformed_timestamp_is_reported() {
        let predictor = baseline_predictor(vec![1.0; 11]);
        let mut record = reference_record();
        record.timestamp = Some("2022-01-01 10:00".to_string());

        let err = predictor.try_predict(&record).unwrap_err();
        assert!(err.is_client_error());
        assert!(!predictor.predict(&record).success);
    }

    #[test]
    fn test_invalid_record_is_reported() {
        let predictor = baseline_predictor(vec![1.0; 11]);
        let mut record = reference_record();
        record.square_footage = 0;

        let err = predictor.try_predict(&record).unwrap_err();
        assert!(matches!(err, ForecastError::Validation(_)));
    }

    #[test]
    fn test_model_failure_is_reported() {
        let names = FeatureSchema::baseline().names();
        let stub = LinearStub::new(names.clone(), vec![]);
        let predictor = EnergyPredictor::new(
            Box::new(FailingModel(stub.metadata.clone())),
            PreprocessingPipeline::identity(),
            names,
        )
        .unwrap();

        let outcome = predictor.predict(&reference_record());
        assert_eq!(outcome, PredictionOutcome::failed("model error: forest exploded"));
    }

    #[test]
    fn test_predictor_rejects_mismatched_layout() {
        let names = FeatureSchema::baseline().names();
        let mut reversed = names.clone();
        reversed.reverse();

        let err = EnergyPredictor::new(
            Box::new(LinearStub::new(reversed, vec![1.0; 11])),
            PreprocessingPipeline::identity(),
            names,
        )
        .unwrap_err();
        assert!(matches!(err, ForecastError::Artifact(_)));
    }

    #[test]
    fn test_predictor_rejects_series_features() {
        let names = vec!["Temperature".to_string(), "EnergyConsumption_ma_6".to_string()];
        let err = EnergyPredictor::new(
            Box::new(LinearStub::new(names.clone(), vec![1.0; 2])),
            PreprocessingPipeline::identity(),
            names,
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "feature EnergyConsumption_ma_6 cannot be derived from a single record"
        );
    }

    #[test]
    fn test_predict_energy_reports_missing_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());

        let outcome = predict_energy(&store, &reference_record());
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("energy_model.bin"));
    }

    #[test]
    fn test_outcome_wire_format() {
        let ok = serde_json::to_value(PredictionOutcome::succeeded(12.34)).unwrap();
        assert_eq!(ok, serde_json::json!({"success": true, "predicted_energy": 12.34}));

        let failed = serde_json::to_value(PredictionOutcome::failed("boom")).unwrap();
        assert_eq!(failed, serde_json::json!({"success": false, "error": "boom"}));
    }
}
