//! Audio container encoding.

pub mod wav;

pub use wav::{WAV_MIME, encode_wav};
