//! Ledger engine configuration

use std::time::Duration;

/// Default number of retries after a version conflict
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Tuning knobs for the transfer engine
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Retries after the first attempt before a conflict is surfaced
    pub max_retries: u32,

    /// Base pause before a retry; the n-th retry waits `n * retry_backoff`
    pub retry_backoff: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            retry_backoff: Duration::from_millis(1),
        }
    }
}

impl LedgerConfig {
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_backoff(mut self, retry_backoff: Duration) -> Self {
        self.retry_backoff = retry_backoff;
        self
    }
}
