//! Configuration module for the synthesis server and the relay client.
//!
//! Provides CLI argument parsing, the relay's live configuration store and the voice registry.

#[allow(clippy::module_inception)]
mod config;
mod relay;
mod store;
pub mod voices;

pub use config::{Backend, Provider, ServerConfig};
pub use relay::{DEFAULT_HOST, DEFAULT_PORT, MAX_TIMEOUT, MIN_TIMEOUT, RelayConfig, RelayOptions};
pub use store::ConfigStore;
