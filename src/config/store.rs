//! Process-wide store for the relay's live configuration.
//!
//! Readers always get the latest snapshot, so option changes (new base timeout, new default
//! speaker) apply to the next request without rebuilding the client.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::watch;
use tracing::info;

use super::RelayOptions;

/// Read-through accessor over the relay options with change notifications.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    tx: Arc<watch::Sender<RelayOptions>>,
}

impl ConfigStore {
    /// Create a store holding `options`, normalized first.
    pub fn new(mut options: RelayOptions) -> Result<Self> {
        options.normalize()?;
        let (tx, _rx) = watch::channel(options);
        Ok(Self { tx: Arc::new(tx) })
    }

    /// Latest published options.
    pub fn current(&self) -> RelayOptions {
        self.tx.borrow().clone()
    }

    /// Latest base timeout in seconds.
    pub fn base_timeout_secs(&self) -> u64 {
        self.tx.borrow().base_timeout_secs
    }

    /// Apply `change` to a copy of the current options, validate it and publish it.
    ///
    /// # Errors
    /// Returns an error (and publishes nothing) if the changed options do not validate.
    pub fn update(&self, change: impl FnOnce(&mut RelayOptions)) -> Result<()> {
        let mut next = self.current();
        change(&mut next);
        next.normalize()?;

        info!("Relay configuration updated (base timeout {}s, profile {})", next.base_timeout_secs, next.profile);
        self.tx.send_replace(next);
        Ok(())
    }

    /// Receiver notified on every update.
    pub fn subscribe(&self) -> watch::Receiver<RelayOptions> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_is_visible_to_readers() {
        let store = ConfigStore::new(RelayOptions::default()).unwrap();
        assert_eq!(store.base_timeout_secs(), 60);

        store.update(|o| o.base_timeout_secs = 120).unwrap();
        assert_eq!(store.base_timeout_secs(), 120);
        assert_eq!(store.clone().current().base_timeout_secs, 120);
    }

    #[test]
    fn test_invalid_update_is_not_published() {
        let store = ConfigStore::new(RelayOptions::default()).unwrap();
        assert!(store.update(|o| o.default_speed = 9.0).is_err());
        assert_eq!(store.current().default_speed, 1.0);
    }

    #[tokio::test]
    async fn test_subscribers_are_notified() {
        let store = ConfigStore::new(RelayOptions::default()).unwrap();
        let mut rx = store.subscribe();

        store.update(|o| o.default_speaker = Some("Ethan".into())).unwrap();

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().default_speaker.as_deref(), Some("Ethan"));
    }
}
