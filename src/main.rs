use anyhow::{Context, Result};
use clap::Parser;
use consult_scribe::notes::{HttpNoteBackend, NoteGenerationClient};
use consult_scribe::persist::MemoryStore;
use consult_scribe::transcribe::HttpBatchChannel;
use consult_scribe::{create_router, AppState, Config};
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "consult-scribe", about = "Consultation transcription service")]
struct Args {
    /// Path to the configuration file (without extension)
    #[arg(long, default_value = "config/consult-scribe")]
    config: String,

    /// Override the configured HTTP port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let mut cfg = Config::load(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config))?;

    if let Some(port) = args.port {
        cfg.service.http.port = port;
    }

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));
    info!(
        "Streaming backend: {}",
        cfg.transcription.stream.nats_url
    );
    info!("Batch endpoint: {}", cfg.transcription.batch.endpoint);
    info!("Recordings path: {}", cfg.audio.recordings_path);

    let config = Arc::new(cfg);
    let batch = Arc::new(HttpBatchChannel::new(config.transcription.batch.clone()));
    let persist = Arc::new(MemoryStore::new());
    let notes = Arc::new(NoteGenerationClient::new(Arc::new(HttpNoteBackend::new(
        config.notes.clone(),
    ))));

    let state = AppState::new(Arc::clone(&config), batch, persist, notes);
    let router = create_router(state);

    let addr = format!("{}:{}", config.service.http.bind, config.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .await
        .context("HTTP server failed")?;

    Ok(())
}
