//! docpipe — single-binary document intake and analysis server.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod processing;
mod routes;
mod state;

use state::AppState;

fn resolve_data_dir() -> PathBuf {
    std::env::var("DOCPIPE_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let data_dir = resolve_data_dir();
    info!("Data directory: {}", data_dir.display());

    let config = docpipe_core::DocpipeConfig::from_env(&data_dir)?;
    let port = config.port;

    let store = docpipe_store::Store::open(&config.data_paths.db)
        .map_err(|e| anyhow::anyhow!("Failed to open store: {}", e))?;

    // Probe external OCR engines once; missing binaries degrade to
    // text-layer-only extraction and are reported by /api/health.
    let engines = docpipe_ocr::OcrEngines::probe().await;
    if !engines.any() {
        warn!("No OCR engine found on PATH; image uploads will fail until one is installed");
    }
    let extractor = docpipe_ocr::TextExtractor::new(
        engines,
        &config.data_paths.tmp,
        config.ocr_max_pages,
        config.ocr_confidence_threshold,
    );

    let client = docpipe_ai::OllamaClient::new(
        &config.ollama_base_url,
        &config.ollama_model,
        config.ai_timeout_secs,
    );
    let ai_health = client.health().await;
    info!(
        "AI backend: {} ({} at {})",
        ai_health.status, config.ollama_model, config.ollama_base_url
    );
    let analyzer = docpipe_ai::DocumentAnalyzer::new(client);

    // Sweep stale export files from previous runs.
    match docpipe_export::cleanup_old_exports(&config.data_paths.exports, 30) {
        Ok(0) => {}
        Ok(count) => info!("Removed {} expired export files", count),
        Err(e) => warn!("Export cleanup failed: {}", e),
    }

    let state = Arc::new(AppState::new(config, store, extractor, analyzer));

    processing::start_processing_worker(state.clone());

    let app = routes::build_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("docpipe server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
