//! Serve loop: bind, load the model in the background, serve until a shutdown signal.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::host::ModelHost;
use super::pipeline::Synthesizer;
use super::routes::{AppState, router};
use super::scratch::ScratchDir;
use crate::config::ServerConfig;
use crate::tts;

/// The synthesis HTTP server.
pub struct TtsServer {
    config: ServerConfig,
    host: Arc<ModelHost>,
    synthesizer: Arc<Synthesizer>,
}

impl TtsServer {
    /// Prepare the server. The model is not loaded until [`TtsServer::run`].
    ///
    /// # Errors
    /// Returns an error if the scratch directory cannot be created.
    pub fn new(config: ServerConfig) -> Result<Self> {
        let scratch = ScratchDir::create(&config.output_dir).with_context(|| format!("Failed to create output directory {}", config.output_dir.display()))?;
        let host = Arc::new(ModelHost::new());
        let synthesizer = Arc::new(Synthesizer::new(Arc::clone(&host), Arc::new(scratch)));

        Ok(Self { config, host, synthesizer })
    }

    pub fn host(&self) -> Arc<ModelHost> {
        Arc::clone(&self.host)
    }

    /// Run until Ctrl+C or SIGTERM.
    ///
    /// The listener is bound first so `/health` answers (as unhealthy) while the model
    /// loads. A failed load stops the server and is returned as an error.
    pub async fn run(self) -> Result<()> {
        let addr: SocketAddr = self.config.bind_addr()?;
        let listener = TcpListener::bind(addr).await.with_context(|| format!("Failed to bind {}", addr))?;
        info!("🌐 Listening on http://{}", listener.local_addr().unwrap_or(addr));

        let shutdown = CancellationToken::new();
        let app = router(AppState::new(Arc::clone(&self.synthesizer)));

        let serve_shutdown = shutdown.clone();
        let mut server = tokio::spawn(async move { axum::serve(listener, app).with_graceful_shutdown(async move { serve_shutdown.cancelled().await }).await });

        let host = Arc::clone(&self.host);
        let load_config = self.config.clone();
        let loaded = tokio::task::spawn_blocking(move || host.load(|| tts::load_backend(&load_config)))
            .await
            .map_err(|e| anyhow!("model load task failed: {}", e))
            .and_then(|result| result.map_err(anyhow::Error::from));

        if let Err(e) = loaded {
            error!("❌ Cannot serve without a model: {}", e);
            shutdown.cancel();
            let _ = server.await;
            return Err(e.context("Model load failed"));
        }

        info!("✅ TTS server ready");

        let exited_early = tokio::select! {
            _ = wait_for_shutdown() => None,
            result = &mut server => Some(result),
        };

        shutdown.cancel();

        match exited_early {
            Some(result) => result.context("HTTP server task panicked")?.context("HTTP server failed")?,
            None => {
                let timeout = Duration::from_secs(self.config.shutdown_timeout_secs);
                match tokio::time::timeout(timeout, server).await {
                    Ok(result) => result.context("HTTP server task panicked")?.context("HTTP server failed")?,
                    Err(_) => warn!("Shutdown timeout, forcing exit"),
                }
            }
        }

        info!("👋 Server stopped");
        Ok(())
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn wait_for_shutdown() {
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("🛑 Received Ctrl+C, shutting down...");
        }
        _ = async {
            #[cfg(unix)]
            {
                let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
                    .expect("Failed to register SIGTERM handler");
                sigterm.recv().await;
            }
            #[cfg(not(unix))]
            {
                std::future::pending::<()>().await;
            }
        } => {
            info!("🛑 Received SIGTERM, shutting down...");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Backend;
    use clap::Parser;

    fn config(output_dir: &std::path::Path, backend: Backend) -> ServerConfig {
        let mut config = ServerConfig::parse_from(["qwen3-tts-server", "--host", "127.0.0.1", "--port", "0"]);
        config.output_dir = output_dir.to_path_buf();
        config.backend = backend;
        config
    }

    #[test]
    fn test_new_creates_output_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("outputs");
        let server = TtsServer::new(config(&out, Backend::Mock)).unwrap();
        assert!(out.is_dir());
        assert!(!server.host().is_ready());
    }

    #[cfg(not(feature = "kokoro"))]
    #[tokio::test]
    async fn test_load_failure_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let server = TtsServer::new(config(tmp.path(), Backend::Kokoro)).unwrap();

        let err = server.run().await.unwrap_err();
        assert!(format!("{:#}", err).contains("Model load failed"));
    }
}
