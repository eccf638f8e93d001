//! Controller timing configuration.

use std::time::Duration;

use kanban_core::constants::{
    DEFAULT_CARD_RETRY_MS, DEFAULT_CARD_WAIT_TIMEOUT_MS, DEFAULT_PRESENCE_POLL_MS,
    DEFAULT_READER_RETRY_MS, DEFAULT_REMOVAL_POLL_MS, DEFAULT_REMOVAL_TIMEOUT_MS, MAX_BATCH_SIZE,
};
use kanban_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Timing and limits used by the session controller.
///
/// The defaults were tuned for an ACR122U; none of them are load-bearing
/// beyond "bounded". Every field can be overridden from the `[controller]`
/// table of the config file.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use kanban_controller::ControllerConfig;
///
/// let config = ControllerConfig::default()
///     .card_wait_timeout_ms(5_000)
///     .removal_timeout_ms(3_000);
///
/// assert_eq!(config.card_wait_timeout(), Duration::from_secs(5));
/// assert_eq!(config.presence_poll(), Duration::from_millis(500));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Presence monitor period while a reader is connected.
    pub presence_poll_ms: u64,

    /// Reader discovery period while no reader is connected.
    pub reader_retry_ms: u64,

    /// How long a single-card operation waits for a card.
    pub card_wait_timeout_ms: u64,

    /// Presence poll period while waiting for a card to be removed.
    pub removal_poll_ms: u64,

    /// Removal wait ceiling; reaching it only logs a warning.
    pub removal_timeout_ms: u64,

    /// Retry period of the cancellable card wait.
    pub card_retry_ms: u64,

    /// Largest accepted write-N batch.
    pub max_batch_size: u32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            presence_poll_ms: DEFAULT_PRESENCE_POLL_MS,
            reader_retry_ms: DEFAULT_READER_RETRY_MS,
            card_wait_timeout_ms: DEFAULT_CARD_WAIT_TIMEOUT_MS,
            removal_poll_ms: DEFAULT_REMOVAL_POLL_MS,
            removal_timeout_ms: DEFAULT_REMOVAL_TIMEOUT_MS,
            card_retry_ms: DEFAULT_CARD_RETRY_MS,
            max_batch_size: MAX_BATCH_SIZE,
        }
    }
}

impl ControllerConfig {
    /// Set the presence monitor period
    pub fn presence_poll_ms(mut self, ms: u64) -> Self {
        self.presence_poll_ms = ms;
        self
    }

    /// Set the reader discovery period
    pub fn reader_retry_ms(mut self, ms: u64) -> Self {
        self.reader_retry_ms = ms;
        self
    }

    /// Set the card wait timeout
    pub fn card_wait_timeout_ms(mut self, ms: u64) -> Self {
        self.card_wait_timeout_ms = ms;
        self
    }

    /// Set the removal poll period
    pub fn removal_poll_ms(mut self, ms: u64) -> Self {
        self.removal_poll_ms = ms;
        self
    }

    /// Set the removal wait ceiling
    pub fn removal_timeout_ms(mut self, ms: u64) -> Self {
        self.removal_timeout_ms = ms;
        self
    }

    /// Set the cancellable wait retry period
    pub fn card_retry_ms(mut self, ms: u64) -> Self {
        self.card_retry_ms = ms;
        self
    }

    /// Set the largest accepted batch
    pub fn max_batch_size(mut self, max: u32) -> Self {
        self.max_batch_size = max;
        self
    }

    /// Check that every period is non-zero and the batch limit is usable.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        let periods = [
            ("presence_poll_ms", self.presence_poll_ms),
            ("reader_retry_ms", self.reader_retry_ms),
            ("card_wait_timeout_ms", self.card_wait_timeout_ms),
            ("removal_poll_ms", self.removal_poll_ms),
            ("removal_timeout_ms", self.removal_timeout_ms),
            ("card_retry_ms", self.card_retry_ms),
        ];

        if let Some((name, _)) = periods.iter().find(|(_, ms)| *ms == 0) {
            return Err(Error::Config(format!("{} must be greater than zero", name)));
        }

        if self.max_batch_size == 0 {
            return Err(Error::Config(
                "max_batch_size must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    pub fn presence_poll(&self) -> Duration {
        Duration::from_millis(self.presence_poll_ms)
    }

    pub fn reader_retry(&self) -> Duration {
        Duration::from_millis(self.reader_retry_ms)
    }

    pub fn card_wait_timeout(&self) -> Duration {
        Duration::from_millis(self.card_wait_timeout_ms)
    }

    pub fn removal_poll(&self) -> Duration {
        Duration::from_millis(self.removal_poll_ms)
    }

    pub fn removal_timeout(&self) -> Duration {
        Duration::from_millis(self.removal_timeout_ms)
    }

    pub fn card_retry(&self) -> Duration {
        Duration::from_millis(self.card_retry_ms)
    }
}
