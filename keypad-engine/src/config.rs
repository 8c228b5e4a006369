use std::time::Duration;

use crate::debounce::Debounce;
use crate::error::ConfigError;

/// Polling target of about 50 scans per second.
const DEFAULT_POLL_PERIOD: Duration = Duration::from_millis(20);

/// Tunables fixed for the lifetime of a keypad.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct KeypadConfig {
    pub debounce: Debounce,
    /// Wake-up period of the polling loop.
    pub poll_period: Duration,
}

impl Default for KeypadConfig {
    fn default() -> Self {
        Self {
            debounce: Debounce::TrustHardware,
            poll_period: DEFAULT_POLL_PERIOD,
        }
    }
}

impl KeypadConfig {
    pub fn with_debounce(mut self, debounce: Debounce) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_poll_period(mut self, period: Duration) -> Self {
        self.poll_period = period;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_period.is_zero() {
            return Err(ConfigError::ZeroPeriod);
        }
        Ok(())
    }
}
