//! Synthesis server configuration and CLI argument parsing.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::voices;

/// Hardware acceleration provider for ONNX models.
/// Auto-detected based on platform if not specified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// CPU inference (default fallback, always available)
    #[default]
    Cpu,
    /// NVIDIA CUDA acceleration (Linux only, requires CUDA toolkit)
    Cuda,
    /// Apple CoreML acceleration (macOS only, uses Neural Engine)
    #[value(name = "coreml")]
    CoreMl,
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::Cpu => write!(f, "cpu"),
            Provider::Cuda => write!(f, "cuda"),
            Provider::CoreMl => write!(f, "coreml"),
        }
    }
}

impl Provider {
    /// Convert to sherpa-rs provider string.
    pub fn as_sherpa_provider(&self) -> &'static str {
        match self {
            Provider::Cpu => "cpu",
            Provider::Cuda => "cuda",
            Provider::CoreMl => "coreml",
        }
    }
}

/// Inference backend loaded at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Deterministic tone generator, no model weights required
    Mock,
    /// Kokoro via sherpa-rs (requires the `kokoro` feature and model files)
    Kokoro,
}

impl Default for Backend {
    fn default() -> Self {
        if cfg!(feature = "kokoro") { Backend::Kokoro } else { Backend::Mock }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Mock => write!(f, "mock"),
            Backend::Kokoro => write!(f, "kokoro"),
        }
    }
}

/// Synthesis server configuration.
#[derive(Parser, Debug, Clone, Serialize, Deserialize)]
#[command(name = "qwen3-tts-server")]
#[command(author, version, about = "GPU-accelerated text-to-speech HTTP server", long_about = None)]
pub struct ServerConfig {
    /// List all registered voices and exit
    #[arg(long)]
    pub list_voices: bool,

    /// Show detailed information about a specific voice and exit
    #[arg(long)]
    pub voice_info: Option<String>,

    /// Address to listen on
    #[arg(long, env = "TTS_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, short = 'P', env = "TTS_PORT", default_value = "7861")]
    pub port: u16,

    /// Inference backend
    #[arg(long, short = 'b', value_enum, default_value_t = Backend::default())]
    pub backend: Backend,

    /// Directory containing model files (Kokoro backend)
    #[arg(long, short = 'd', env = "MODEL_DIR", default_value_os_t = default_model_dir())]
    pub model_dir: PathBuf,

    /// Directory where generated WAV files are kept
    #[arg(long, short = 'o', env = "TTS_OUTPUT_DIR", default_value = "/tmp/qwen3-tts-outputs")]
    pub output_dir: PathBuf,

    /// Hardware acceleration provider (auto-detected if not specified)
    #[arg(long, value_enum)]
    pub provider: Option<Provider>,

    /// TTS threads (0 = auto-detect based on CPU cores and provider)
    #[arg(long, default_value = "0")]
    pub tts_threads: usize,

    /// Seconds to wait for in-flight requests on shutdown
    #[arg(long, default_value = "30")]
    pub shutdown_timeout_secs: u64,

    /// Enable verbose logging
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

impl ServerConfig {
    /// Parse configuration from command line arguments.
    pub fn from_args() -> Self {
        let mut config = Self::parse();

        // Handle voice listing commands
        if config.list_voices {
            voices::print_voices();
            std::process::exit(0);
        }

        if let Some(ref voice_name) = config.voice_info {
            match voices::print_voice_info(voice_name) {
                Ok(_) => std::process::exit(0),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }

        config.normalize_thread_counts();
        config
    }

    /// Auto-detect the TTS thread count.
    ///
    /// With CUDA the GPU handles parallelism internally, so a single thread avoids resource
    /// contention and CUDA allocation failures. On CPU, cores/3 leaves headroom for the HTTP runtime.
    fn normalize_thread_counts(&mut self) {
        if self.tts_threads != 0 {
            return;
        }

        let cpu_cores = num_cpus::get();
        self.tts_threads = if self.effective_provider() == Provider::Cuda { 1 } else { (cpu_cores / 3).max(1) };

        if self.verbose {
            info!("CPU cores: {}, Provider: {}, TTS threads: {}", cpu_cores, self.effective_provider(), self.tts_threads);
        }
    }

    /// Get the effective TTS provider.
    pub fn effective_provider(&self) -> Provider {
        self.provider.unwrap_or_else(detect_provider)
    }

    /// Socket address the HTTP server binds to.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port).parse().with_context(|| format!("Invalid listen address {}:{}", self.host, self.port))
    }

    fn kokoro_dir(&self) -> PathBuf {
        self.model_dir.join("tts").join("kokoro-multi-lang-v1_0")
    }

    /// Get the path to the Kokoro TTS model.
    pub fn tts_model_path(&self) -> PathBuf {
        self.kokoro_dir().join("model.onnx")
    }

    /// Get the path to the Kokoro TTS voices.bin file.
    pub fn tts_voices_path(&self) -> PathBuf {
        self.kokoro_dir().join("voices.bin")
    }

    /// Get the path to the TTS tokens file.
    pub fn tts_tokens_path(&self) -> PathBuf {
        self.kokoro_dir().join("tokens.txt")
    }

    /// Get the path to the TTS data directory.
    pub fn tts_data_dir(&self) -> PathBuf {
        self.kokoro_dir().join("espeak-ng-data")
    }

    /// Get the path to the TTS dict directory (for Chinese segmentation).
    pub fn tts_dict_dir(&self) -> PathBuf {
        self.kokoro_dir().join("dict")
    }

    /// Lexicon list for Kokoro. The server speaks Chinese, with English as fallback for mixed text.
    pub fn tts_lexicon(&self) -> String {
        let dir = self.kokoro_dir();
        format!("{},{}", dir.join("lexicon-us-en.txt").to_string_lossy(), dir.join("lexicon-zh.txt").to_string_lossy())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        self.bind_addr()?;

        if self.backend == Backend::Kokoro {
            if !cfg!(feature = "kokoro") {
                anyhow::bail!("Kokoro backend requested but this build lacks the `kokoro` feature");
            }

            if !self.model_dir.exists() {
                anyhow::bail!("Model directory does not exist: {}", self.model_dir.display());
            }

            let required_files = [self.tts_model_path(), self.tts_voices_path(), self.tts_tokens_path()];
            for path in &required_files {
                if !path.exists() {
                    anyhow::bail!("Required model file not found: {}", path.display());
                }
            }
        }

        Ok(())
    }

    /// Log the current configuration.
    pub fn log_config(&self) {
        info!("Configuration:");
        info!("  Listen address: {}:{}", self.host, self.port);
        info!("  Backend: {}", self.backend);
        if self.backend == Backend::Kokoro {
            info!("  Model directory: {}", self.model_dir.display());
            info!("  TTS provider: {}", self.effective_provider());
            info!("  TTS threads: {}", self.tts_threads);
        }
        info!("  Output directory: {}", self.output_dir.display());
        info!("  Voices: {}", voices::all_voices().join(", "));
    }
}

/// Get the default model directory (~/.qwen3-tts/models).
fn default_model_dir() -> PathBuf {
    if let Some(home_dir) = dirs::home_dir() {
        home_dir.join(".qwen3-tts").join("models")
    } else {
        PathBuf::from("models")
    }
}

/// Auto-detect the best hardware acceleration provider.
fn detect_provider() -> Provider {
    #[cfg(target_os = "macos")]
    {
        info!("Detected macOS, using CoreML provider");
        Provider::CoreMl
    }

    #[cfg(target_os = "linux")]
    {
        if has_nvidia_gpu() {
            info!("Detected NVIDIA GPU, using CUDA provider");
            Provider::Cuda
        } else {
            info!("No GPU detected, using CPU provider");
            Provider::Cpu
        }
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        info!("Using CPU provider");
        Provider::Cpu
    }
}

/// Check if an NVIDIA GPU is available (Linux only).
#[cfg(target_os = "linux")]
fn has_nvidia_gpu() -> bool {
    use std::path::Path;

    let nvidia_paths = ["/dev/nvidia0", "/dev/nvidiactl", "/dev/nvidia-uvm", "/dev/nvhost-ctrl", "/dev/nvhost-ctrl-gpu"];

    nvidia_paths.iter().any(|p| Path::new(p).exists()) || Path::new("/etc/nv_tegra_release").exists()
}
