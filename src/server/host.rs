//! Owner of the process-wide model instance.
//!
//! The model is loaded exactly once during startup (`Unloaded → Loading → Ready`, or
//! `Failed` if the loader errors) and is never replaced afterwards. Requests borrow it
//! through a mutual-exclusion gate, one generation at a time.

use std::sync::OnceLock;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{error, info};

use crate::error::{TtsError, TtsResult};
use crate::tts::SpeechModel;

/// Lifecycle of the loaded model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelState {
    Unloaded,
    Loading,
    Ready,
    /// Terminal: the one load attempt failed.
    Failed,
}

impl std::fmt::Display for ModelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelState::Unloaded => write!(f, "unloaded"),
            ModelState::Loading => write!(f, "loading"),
            ModelState::Ready => write!(f, "ready"),
            ModelState::Failed => write!(f, "failed"),
        }
    }
}

/// Holds the single model instance and its lifecycle state.
pub struct ModelHost {
    state: RwLock<ModelState>,                     // Lifecycle, readable without touching the gate
    model: OnceLock<Mutex<Box<dyn SpeechModel>>>, // Set once on the Ready transition
    backend: OnceLock<String>,                     // Backend name for health reporting
}

impl Default for ModelHost {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelHost {
    /// Create an empty host in the `Unloaded` state.
    pub fn new() -> Self {
        Self { state: RwLock::new(ModelState::Unloaded), model: OnceLock::new(), backend: OnceLock::new() }
    }

    pub fn state(&self) -> ModelState {
        *self.state.read()
    }

    pub fn is_ready(&self) -> bool {
        self.state() == ModelState::Ready
    }

    /// Name of the loaded backend, once ready.
    pub fn backend_name(&self) -> Option<&str> {
        self.backend.get().map(String::as_str)
    }

    /// Load the model. Blocking; call from a blocking context.
    ///
    /// # Arguments
    /// * `loader` - Constructs the model
    ///
    /// # Returns
    /// Time spent loading.
    ///
    /// # Errors
    /// Returns `ModelLoad` if a load was already attempted (successful or not) or the loader fails.
    pub fn load(&self, loader: impl FnOnce() -> TtsResult<Box<dyn SpeechModel>>) -> TtsResult<Duration> {
        {
            let mut state = self.state.write();
            if *state != ModelState::Unloaded || self.model.get().is_some() {
                return Err(TtsError::ModelLoad(format!("load already attempted (state: {})", *state)));
            }
            *state = ModelState::Loading;
        }

        info!("🚀 Loading TTS model...");
        let start = Instant::now();

        let model = match loader() {
            Ok(model) => model,
            Err(e) => {
                *self.state.write() = ModelState::Failed;
                error!("❌ Model load failed: {}", e);
                return Err(match e {
                    TtsError::ModelLoad(_) => e,
                    other => TtsError::ModelLoad(other.to_string()),
                });
            }
        };

        let name = model.name().to_string();
        if self.model.set(Mutex::new(model)).is_err() {
            return Err(TtsError::ModelLoad("model slot already filled".to_string()));
        }
        let _ = self.backend.set(name.clone());
        *self.state.write() = ModelState::Ready;

        let elapsed = start.elapsed();
        info!("✅ Model '{}' loaded in {:.2}s", name, elapsed.as_secs_f64());
        Ok(elapsed)
    }

    /// Run `f` with exclusive access to the model.
    ///
    /// # Errors
    /// Returns `ModelNotReady` without calling `f` unless the host is `Ready`; otherwise whatever `f` returns.
    pub fn with_model<R>(&self, f: impl FnOnce(&mut dyn SpeechModel) -> TtsResult<R>) -> TtsResult<R> {
        let state = self.state();
        if state != ModelState::Ready {
            return Err(TtsError::ModelNotReady(state));
        }

        let gate = self.model.get().ok_or(TtsError::ModelNotReady(state))?;
        let mut model = gate.lock();
        f(&mut **model)
    }
}
