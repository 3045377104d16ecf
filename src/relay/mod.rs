//! Relay client module: forwards text to a synthesis server.
//!
//! Picks the endpoint for the configured deployment profile, sizes the deadline to the
//! text, and classifies whatever comes back.

mod client;
mod profile;
mod timeout;

pub use client::{AUDIO_FORMAT, HealthReport, RelayClient, TtsAudio, TtsOptions};
pub use profile::{EndpointProfile, ResolvedSpeaker, SpeakerSource};
pub use timeout::{TimeoutEstimator, estimate_timeout};
