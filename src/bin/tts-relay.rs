//! TTS relay - sends text to a Qwen3 TTS server and writes the returned WAV to disk.

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use qwen3_tts::config::voices;
use qwen3_tts::config::{ConfigStore, RelayConfig};
use qwen3_tts::logging::init_logging;
use qwen3_tts::relay::{RelayClient, TtsOptions};

#[tokio::main]
async fn main() -> Result<()> {
    let config = RelayConfig::from_args();

    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("❌ Configuration error: {}", e);
        std::process::exit(1);
    }

    config.log_config();

    let store = ConfigStore::new(config.options()?)?;
    let client = RelayClient::new(store)?;

    if config.list_voices {
        match client.get_speakers().await {
            Some(speakers) => {
                println!("Voices advertised by {}:", client.store().current().base_url());
                for speaker in speakers {
                    println!("  {}", speaker);
                }
            }
            None => {
                warn!("Server did not list its speakers, showing the built-in registry");
                voices::print_voices();
            }
        }
        return Ok(());
    }

    // Fail fast when the server is down or still loading its model
    let report = client.check_health().await.context("TTS server health check failed")?;
    info!("✅ TTS server healthy ({} speakers)", report.supported_speakers.len());

    if config.check {
        return Ok(());
    }

    let Some(text) = config.text.as_deref() else {
        anyhow::bail!("Text to synthesize is required");
    };

    let options = TtsOptions { speaker: config.speaker.clone(), speed: config.speed };
    let Some(audio) = client.get_tts_audio(text, &options).await else {
        error!("❌ No audio received");
        std::process::exit(1);
    };

    tokio::fs::write(&config.output, &audio.data).await.with_context(|| format!("Failed to write {}", config.output.display()))?;
    info!("💾 Saved {} bytes of {} audio to {}", audio.data.len(), audio.format, config.output.display());

    Ok(())
}
