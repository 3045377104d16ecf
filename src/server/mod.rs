//! Synthesis server: one hosted model behind an HTTP API.

mod host;
mod pipeline;
mod routes;
mod scratch;
#[allow(clippy::module_inception)]
mod server;

pub use host::{ModelHost, ModelState};
pub use pipeline::{SynthesisOutput, Synthesizer, assemble_chunks};
pub use routes::{AppState, router};
pub use scratch::ScratchDir;
pub use server::TtsServer;
