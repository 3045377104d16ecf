//! Scratch directory for encoded synthesis results.
//!
//! Every successful request leaves one WAV file behind. Names combine wall-clock
//! milliseconds with a process-wide sequence number, so concurrent requests landing in
//! the same millisecond still get distinct files. Nothing here deletes old files.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::debug;

use crate::error::TtsResult;

/// Writable directory holding one WAV file per successful request.
#[derive(Debug)]
pub struct ScratchDir {
    dir: PathBuf,
    sequence: AtomicU64,
}

impl ScratchDir {
    /// Create the directory if needed.
    ///
    /// # Errors
    /// Returns `Io` if the directory cannot be created.
    pub fn create(dir: impl Into<PathBuf>) -> TtsResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir, sequence: AtomicU64::new(0) })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reserve a fresh file path: `tts_<unix_millis>_<seq>.wav`.
    pub fn next_path(&self) -> PathBuf {
        let millis = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis()).unwrap_or_default();
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        self.dir.join(format!("tts_{}_{}.wav", millis, seq))
    }

    /// Write encoded audio to a fresh path.
    ///
    /// # Returns
    /// The path written.
    pub async fn persist(&self, bytes: &[u8]) -> TtsResult<PathBuf> {
        let path = self.next_path();
        tokio::fs::write(&path, bytes).await?;
        debug!("Saved {} bytes to {}", bytes.len(), path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a").join("b");
        let scratch = ScratchDir::create(&nested).unwrap();
        assert!(nested.is_dir());
        assert_eq!(scratch.dir(), nested.as_path());
    }

    #[test]
    fn test_paths_are_unique() {
        let tmp = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::create(tmp.path()).unwrap();

        let paths: HashSet<_> = (0..100).map(|_| scratch.next_path()).collect();
        assert_eq!(paths.len(), 100);

        let name = scratch.next_path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("tts_") && name.ends_with(".wav"));
    }

    #[tokio::test]
    async fn test_persist_writes_bytes() {
        let tmp = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::create(tmp.path()).unwrap();

        let path = scratch.persist(b"RIFF").await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"RIFF");
        assert!(path.starts_with(tmp.path()));
    }
}
