use std::path::PathBuf;

use thiserror::Error;

use crate::features::FeatureError;

/// Errors surfaced by the prediction path and artifact handling
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error(transparent)]
    Feature(#[from] FeatureError),

    #[error("invalid record: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("artifact error: {0}")]
    Artifact(String),

    #[error("model error: {0}")]
    Model(String),
}

impl ForecastError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ForecastError::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the caller's input, rather than the service, is at fault
    pub fn is_client_error(&self) -> bool {
        match self {
            ForecastError::Validation(_) => true,
            ForecastError::Feature(e) => matches!(
                e,
                FeatureError::Timestamp { .. }
                    | FeatureError::InvalidValue { .. }
                    | FeatureError::MissingFeature(_)
            ),
            _ => false,
        }
    }
}
