//! # sotto
//!
//! Speech-to-text server binary: resolves configuration, loads the
//! transcription engine, and serves HTTP until interrupted.

#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use sotto_server::config::ServerConfig;
use sotto_server::logging;
use sotto_server::server::SottoServer;
use sotto_transcription::{TranscriptionEngine, model};
use tracing::{info, warn};

/// Speech-to-text transcription server.
#[derive(Parser, Debug)]
#[command(name = "sotto", about = "Speech-to-text transcription server")]
struct Cli {
    /// Host to bind (overrides SOTTO_HOST).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (overrides SOTTO_PORT).
    #[arg(long)]
    port: Option<u16>,

    /// Model cache directory (overrides CACHE_DIR).
    #[arg(long)]
    model_dir: Option<PathBuf>,
}

impl Cli {
    /// Env-derived configuration with CLI flags layered on top.
    fn resolve_config(self) -> ServerConfig {
        let mut config = ServerConfig::from_env();
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(dir) = self.model_dir {
            config.model_dir = dir;
        }
        config
    }
}

/// Download (if needed) and load the engine.
///
/// A failure here degrades rather than aborts: the server still comes up and
/// the transcribe route answers `Server Error` until a restart finds a model.
async fn load_engine(model_dir: PathBuf) -> Option<std::sync::Arc<TranscriptionEngine>> {
    if let Err(e) = model::ensure_model(&model_dir).await {
        warn!(error = %e, "model download failed, serving without an engine");
        return None;
    }
    match TranscriptionEngine::new(model_dir).await {
        Ok(engine) => {
            info!("transcription engine ready");
            Some(engine)
        }
        Err(e) => {
            warn!(error = %e, "engine load failed, serving without an engine");
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    logging::init("sotto=info,tower_http=warn");

    let config = args.resolve_config();
    let engine = load_engine(config.model_dir.clone()).await;

    let server = SottoServer::new(config, engine);
    let (addr, handle) = server.listen().await.context("failed to bind server")?;
    info!("sotto listening on http://{addr}");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;

    info!("shutting down...");
    server.shutdown().shutdown();
    let _ = handle.await;

    info!("shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults_to_no_overrides() {
        let cli = Cli::parse_from(["sotto"]);
        assert_eq!(cli.host, None);
        assert_eq!(cli.port, None);
        assert_eq!(cli.model_dir, None);
    }

    #[test]
    fn cli_flags_override_config() {
        let cli = Cli::parse_from([
            "sotto",
            "--host",
            "0.0.0.0",
            "--port",
            "7000",
            "--model-dir",
            "/models/whisper",
        ]);
        let config = cli.resolve_config();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 7000);
        assert_eq!(config.model_dir, PathBuf::from("/models/whisper"));
    }

    #[test]
    fn cli_partial_override_keeps_defaults() {
        let cli = Cli::parse_from(["sotto", "--port", "7000"]);
        let config = cli.resolve_config();
        assert_eq!(config.port, 7000);
        assert_eq!(config.host, ServerConfig::from_env().host);
    }
}
