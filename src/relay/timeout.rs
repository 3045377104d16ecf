//! Request deadline estimation.
//!
//! Generation time grows with text length, so each request gets its own deadline:
//! `min(base + 0.1s * chars, MAX_TIMEOUT)`. Short messages cost about the base allowance,
//! long ones saturate at the cap.

use std::time::Duration;

use tracing::debug;

use crate::config::{ConfigStore, MAX_TIMEOUT};

/// Seconds of allowance per character (1 second per 10 characters).
pub const SECONDS_PER_CHAR: f64 = 0.1;

/// Compute the deadline in seconds for a text of `text_length` characters.
pub fn estimate_timeout(text_length: usize, base_timeout_secs: u64) -> f64 {
    let calculated = base_timeout_secs as f64 + text_length as f64 * SECONDS_PER_CHAR;
    calculated.min(MAX_TIMEOUT as f64)
}

/// Deadline estimator reading the base timeout from the live configuration on every call.
#[derive(Debug, Clone)]
pub struct TimeoutEstimator {
    store: ConfigStore,
}

impl TimeoutEstimator {
    pub fn new(store: ConfigStore) -> Self {
        Self { store }
    }

    /// Deadline for a text of `text_length` characters, using the latest base timeout.
    pub fn deadline(&self, text_length: usize) -> Duration {
        self.deadline_with_base(text_length, self.store.base_timeout_secs())
    }

    /// Deadline for a text of `text_length` characters against an explicit base.
    pub fn deadline_with_base(&self, text_length: usize, base: u64) -> Duration {
        let timeout = estimate_timeout(text_length, base);

        debug!(
            "Timeout calculation: base={}s, text_length={} chars, calculated={:.1}s, final={:.1}s",
            base,
            text_length,
            base as f64 + text_length as f64 * SECONDS_PER_CHAR,
            timeout
        );

        Duration::from_secs_f64(timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RelayOptions;

    #[test]
    fn test_reference_points() {
        assert_eq!(estimate_timeout(0, 60), 60.0);
        assert_eq!(estimate_timeout(1000, 60), 160.0);
        assert_eq!(estimate_timeout(3000, 60), 300.0);
        assert_eq!(estimate_timeout(50, 60), 65.0);
    }

    #[test]
    fn test_capped_for_any_base() {
        for base in [10, 60, 150, 300] {
            assert_eq!(estimate_timeout(100_000, base), 300.0);
            assert!(estimate_timeout(0, base) <= 300.0);
        }
    }

    #[test]
    fn test_monotonic_in_length() {
        for base in [10, 60, 299] {
            let mut previous = 0.0;
            for len in (0..4000).step_by(7) {
                let t = estimate_timeout(len, base);
                assert!(t >= previous, "not monotonic at len={len}, base={base}");
                previous = t;
            }
        }
    }

    #[test]
    fn test_estimator_reads_latest_base() {
        let store = ConfigStore::new(RelayOptions::default()).unwrap();
        let estimator = TimeoutEstimator::new(store.clone());
        assert_eq!(estimator.deadline(0), Duration::from_secs(60));

        store.update(|o| o.base_timeout_secs = 100).unwrap();
        assert_eq!(estimator.deadline(200), Duration::from_secs(120));
        assert_eq!(estimator.deadline_with_base(200, 60), Duration::from_secs(80));
    }
}
