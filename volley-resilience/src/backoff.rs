//! Wait times between retry attempts

use std::time::Duration;

/// `base, 2*base, 4*base, ...` after the first, second, third failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoublingBackoff {
    base: Duration,
}

impl DoublingBackoff {
    pub fn new(base: Duration) -> Self {
        Self { base }
    }

    /// Wait after failed attempt `attempt` (1-indexed). Saturates instead of
    /// overflowing.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let factor = 1u32.checked_shl(attempt - 1).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor)
    }
}
