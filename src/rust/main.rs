use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use team_classifier::{
    create_router, ArtifactPaths, ArtifactSource, ClassificationService, GraphOptimizationLevel,
    RuntimeConfig, DEFAULT_TOP_K,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Serves top-K team predictions for free-text descriptions", long_about = None)]
struct Args {
    /// Directory holding vectorizer.json, label_encoder.json and xgb_classifier.onnx
    #[arg(short, long, env = "TEAM_CLASSIFIER_MODELS", default_value = "MLModels")]
    models_dir: PathBuf,

    /// Vectorizer artifact, overriding the models directory
    #[arg(long, env = "TEAM_CLASSIFIER_VECTORIZER")]
    vectorizer: Option<PathBuf>,

    /// Label encoder artifact, overriding the models directory
    #[arg(long, env = "TEAM_CLASSIFIER_LABEL_ENCODER")]
    label_encoder: Option<PathBuf>,

    /// Classifier artifact (.onnx or .json), overriding the models directory
    #[arg(long, env = "TEAM_CLASSIFIER_CLASSIFIER")]
    classifier: Option<PathBuf>,

    /// Expected SHA-256 of the vectorizer artifact
    #[arg(long)]
    vectorizer_sha256: Option<String>,

    /// Expected SHA-256 of the label encoder artifact
    #[arg(long)]
    label_encoder_sha256: Option<String>,

    /// Expected SHA-256 of the classifier artifact
    #[arg(long)]
    classifier_sha256: Option<String>,

    /// Listen address
    #[arg(short, long, default_value = "0.0.0.0")]
    listen: String,

    /// Listen port
    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// Number of labels returned when the request does not set k
    #[arg(short = 'k', long, default_value_t = DEFAULT_TOP_K)]
    top_k: usize,

    /// ONNX Runtime inter-op threads (0 lets the runtime decide)
    #[arg(long, default_value_t = 0)]
    inter_threads: usize,

    /// ONNX Runtime intra-op threads (0 lets the runtime decide)
    #[arg(long, default_value_t = 0)]
    intra_threads: usize,
}

impl Args {
    fn artifact_paths(&self) -> ArtifactPaths {
        let defaults = ArtifactPaths::from_dir(&self.models_dir);
        ArtifactPaths {
            vectorizer: resolve(defaults.vectorizer, &self.vectorizer, &self.vectorizer_sha256),
            label_encoder: resolve(defaults.label_encoder, &self.label_encoder, &self.label_encoder_sha256),
            classifier: resolve(defaults.classifier, &self.classifier, &self.classifier_sha256),
        }
    }

    fn runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            inter_threads: self.inter_threads,
            intra_threads: self.intra_threads,
            optimization_level: GraphOptimizationLevel::Level3,
        }
    }
}

fn resolve(default: ArtifactSource, path: &Option<PathBuf>, sha256: &Option<String>) -> ArtifactSource {
    let mut source = match path {
        Some(path) => ArtifactSource::new(path),
        None => default,
    };
    source.sha256 = sha256.clone();
    source
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    info!("=== Starting Team Classifier ===");
    let paths = args.artifact_paths();
    info!("Vectorizer: {:?}", paths.vectorizer.path);
    info!("Label encoder: {:?}", paths.label_encoder.path);
    info!("Classifier: {:?}", paths.classifier.path);

    // Fail fast: no traffic is accepted unless all three artifacts load.
    let service = ClassificationService::builder()
        .with_runtime_config(args.runtime_config())
        .with_artifacts(&paths)
        .context("failed to load model artifacts")?
        .with_default_k(args.top_k)?
        .build()?;
    let service = Arc::new(service);

    let addr: SocketAddr = format!("{}:{}", args.listen, args.port)
        .parse()
        .context("invalid listen address")?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, create_router(service))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    warn!("Shutdown signal received, stopping server...");
}
