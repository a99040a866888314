//! Askube daemon - natural-language Q&A over a Kubernetes control plane.
//!
//! Synthesizes a typed retrieval operation from the question, runs it
//! against the apiserver, and summarizes the result.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use askubed::cluster::{ClusterClient, KubeApiClient};
use askubed::config::Config;
use askubed::llm::{LanguageModel, OllamaClient};
use askubed::server::{self, AppState};

/// Log to the file named by ASKUBE_LOG (append-only), stderr otherwise.
fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match std::env::var("ASKUBE_LOG") {
        Ok(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .init();
        }
        Err(_) => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;
    info!("askubed v{} starting", env!("CARGO_PKG_VERSION"));

    let config = Config::load();

    let cluster: Option<Arc<dyn ClusterClient>> = match KubeApiClient::new(&config.cluster) {
        Ok(client) => {
            info!("Kubernetes client initialized for {}", config.cluster.api_url);
            Some(Arc::new(client))
        }
        Err(e) => {
            error!("Failed to initialize Kubernetes client: {:#}", e);
            None
        }
    };

    let ollama = OllamaClient::new(&config.llm);
    if !ollama.is_available().await {
        warn!(
            "Ollama is not reachable at {}; queries will fail until it is",
            config.llm.endpoint
        );
    } else {
        info!("Ollama reachable, model {}", ollama.model());
    }
    let llm: Option<Arc<dyn LanguageModel>> = Some(Arc::new(ollama));

    server::run(AppState::new(config, cluster, llm)).await
}
