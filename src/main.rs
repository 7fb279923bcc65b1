use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use building_energy_forecaster::{
    api, config, data,
    domain::RawRecord,
    features::engineer_dataset,
    ml::{predict_energy, ArtifactStore, EnergyPredictor, PredictionOutcome, TrainingDriver},
    telemetry,
};
use clap::{Parser, Subcommand};
use config::Config;
use telemetry::init_tracing;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "energy-forecaster", version)]
#[command(about = "Train and serve a building energy consumption model")]
struct Cli {
    /// Artifact directory, overrides `paths.artifacts_dir`
    #[arg(long, global = true)]
    artifacts_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Train on a CSV and write the model artifacts
    Train {
        #[arg(long)]
        data: Option<PathBuf>,
    },
    /// Predict one record and print the outcome as JSON
    Predict {
        /// Record as a JSON object
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        record: Option<String>,
        /// File holding the record JSON
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Write the fully engineered dataset, including lag and moving-average columns
    Engineer {
        #[arg(long)]
        data: Option<PathBuf>,
        #[arg(long)]
        output: PathBuf,
    },
    /// Serve predictions over HTTP
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let cfg = Config::load()?;
    let store = ArtifactStore::new(
        cli.artifacts_dir
            .clone()
            .unwrap_or_else(|| cfg.paths.artifacts_dir.clone()),
    );

    match cli.command {
        Command::Train { data } => train(&cfg, &store, data),
        Command::Predict { record, file } => predict(&store, record, file),
        Command::Engineer { data, output } => engineer(&cfg, data, output),
        Command::Serve => serve(&cfg, &store).await,
    }
}

fn train(cfg: &Config, store: &ArtifactStore, data: Option<PathBuf>) -> Result<()> {
    let data = data.unwrap_or_else(|| cfg.paths.data.clone());
    let schema = cfg.features.schema().context("invalid feature configuration")?;

    let driver = TrainingDriver::new(cfg.training.clone(), schema, cfg.preprocessing.clone());
    let report = driver.run(&data, store)?;

    println!("Train R² score: {:.4}", report.train.r2);
    println!("Test R² score: {:.4}", report.test.r2);
    Ok(())
}

fn predict(store: &ArtifactStore, record: Option<String>, file: Option<PathBuf>) -> Result<()> {
    let raw = match (record, file) {
        (Some(raw), _) => raw,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("reading record from {}", path.display()))?,
        (None, None) => anyhow::bail!("either --record or --file is required"),
    };

    let outcome = match serde_json::from_str::<RawRecord>(&raw) {
        Ok(record) => predict_energy(store, &record),
        Err(e) => {
            warn!(error = %e, "malformed record");
            PredictionOutcome::failed(format!("malformed record: {}", e))
        }
    };

    println!("{}", serde_json::to_string(&outcome)?);
    Ok(())
}

fn engineer(cfg: &Config, data: Option<PathBuf>, output: PathBuf) -> Result<()> {
    let data = data.unwrap_or_else(|| cfg.paths.data.clone());
    let records = data::load_records(&data)
        .with_context(|| format!("loading records from {}", data.display()))?;

    let rows = engineer_dataset(&records, &cfg.features.lags, &cfg.features.windows)?;
    data::write_engineered(&output, &rows)?;

    info!(rows = rows.len(), output = %output.display(), "engineered dataset written");
    Ok(())
}

async fn serve(cfg: &Config, store: &ArtifactStore) -> Result<()> {
    let predictor = EnergyPredictor::load(store)
        .with_context(|| format!("loading model artifacts from {}", store.dir().display()))?;
    info!(
        model_id = %predictor.metadata().model_id,
        features = predictor.feature_names().len(),
        "model loaded"
    );

    let state = api::AppState {
        predictor: Arc::new(predictor),
    };
    let app = api::router(state, &cfg.server);

    let addr = cfg.server.socket_addr()?;
    if cfg.server.host == "0.0.0.0" {
        warn!("server binding to 0.0.0.0 - predictions will be reachable from the network");
    }
    info!(%addr, "starting energy forecaster");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(telemetry::shutdown_signal())
        .await?;

    warn!("shutdown complete");
    Ok(())
}
