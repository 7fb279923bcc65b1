use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::features::{
    temporal::{DEFAULT_LAGS, DEFAULT_WINDOWS},
    FeatureError, FeatureSchema, SchemaKind,
};
use crate::ml::{PipelineSpec, TrainingConfig};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub paths: PathsConfig,
    pub training: TrainingConfig,
    pub features: FeaturesConfig,
    pub preprocessing: PipelineSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            request_timeout_secs: 10,
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Training CSV
    pub data: PathBuf,
    /// Directory holding the model, feature list and metadata
    pub artifacts_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data: PathBuf::from("data/energy_consumption.csv"),
            artifacts_dir: PathBuf::from("models"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeaturesConfig {
    /// Preset used when `columns` is not set
    pub schema: SchemaKind,
    /// Explicit ordered feature list, overrides `schema`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,
    /// Lag steps for the engineered export
    pub lags: Vec<usize>,
    /// Moving-average windows for the engineered export
    pub windows: Vec<usize>,
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            schema: SchemaKind::default(),
            columns: None,
            lags: DEFAULT_LAGS.to_vec(),
            windows: DEFAULT_WINDOWS.to_vec(),
        }
    }
}

impl FeaturesConfig {
    pub fn schema(&self) -> Result<FeatureSchema, FeatureError> {
        match &self.columns {
            Some(columns) => FeatureSchema::from_names(columns),
            None => Ok(FeatureSchema::preset(self.schema)),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Ok(Self::figment().extract()?)
    }

    fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file("config/default.toml"))
            .merge(Env::prefixed("EF__").split("__"))
    }
}
