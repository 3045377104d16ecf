//! Qwen3 TTS server - serves speech synthesis over HTTP.
//!
//! Hosts a single text-to-speech model (Kokoro via sherpa-rs, or the mock tone generator)
//! and exposes it through `/api/tts`, `/api/tts_to_speaker`, `/api/list_speakers` and `/health`.

use anyhow::Result;
use tracing::{error, info};

use qwen3_tts::config::ServerConfig;
use qwen3_tts::logging::init_logging;
use qwen3_tts::server::TtsServer;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let config = ServerConfig::from_args();

    init_logging(config.verbose);

    info!("🎙️ Qwen3 TTS server v{}", env!("CARGO_PKG_VERSION"));

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("❌ Configuration error: {}", e);
        error!("Run with --backend mock to serve without model files.");
        std::process::exit(1);
    }

    config.log_config();

    let server = TtsServer::new(config)?;
    server.run().await
}
