//! Exponential backoff with jitter

use crate::config::RetrySettings;
use rand::Rng;
use std::time::Duration;

/// Delay schedule between attempts
#[derive(Debug, Clone)]
pub struct Backoff {
    settings: RetrySettings,
}

impl Backoff {
    pub fn new(settings: RetrySettings) -> Self {
        Self { settings }
    }

    pub fn max_retries(&self) -> u32 {
        self.settings.max_retries
    }

    /// Delay before retry number `attempt` (0 = first retry)
    pub fn delay(&self, attempt: u32) -> Duration {
        let s = &self.settings;
        let base = (s.initial_backoff_ms as f64 * s.backoff_multiplier.powi(attempt as i32))
            .min(s.max_backoff_ms as f64);

        let jittered = if s.jitter_factor > 0.0 {
            let spread = base * s.jitter_factor;
            base + rand::thread_rng().gen_range(-spread..=spread)
        } else {
            base
        };

        Duration::from_millis(jittered.max(0.0) as u64)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(RetrySettings::default())
    }
}
