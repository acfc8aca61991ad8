//! Think time between calls

use rand::Rng;
use std::time::Duration;
use tokio::time::sleep;

/// Upper bound of a single scaled pause
pub const MAX_PAUSE: Duration = Duration::from_secs(3600);

/// Sleeps between calls, scaled by `THINK_TIME_SCALE` (0 disables them)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pacing {
    scale: f64,
}

impl Default for Pacing {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl Pacing {
    pub fn new(scale: f64) -> Self {
        Self {
            scale: if scale.is_finite() { scale.max(0.0) } else { 1.0 },
        }
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// `duration` times the scale, capped at [`MAX_PAUSE`]
    pub fn scaled(&self, duration: Duration) -> Duration {
        Duration::try_from_secs_f64(duration.as_secs_f64() * self.scale)
            .map_or(MAX_PAUSE, |scaled| scaled.min(MAX_PAUSE))
    }

    /// Sleep for `duration`
    pub async fn pause(&self, duration: Duration) {
        let scaled = self.scaled(duration);
        if !scaled.is_zero() {
            sleep(scaled).await;
        }
    }

    /// Sleep for a uniformly random duration in `[min, max]`
    pub async fn think(&self, min: Duration, max: Duration) {
        self.pause(uniform(min, max)).await;
    }
}

/// Uniformly random duration in `[min, max]`
pub fn uniform(min: Duration, max: Duration) -> Duration {
    if max <= min {
        return min;
    }
    rand::thread_rng().gen_range(min..=max)
}

/// `base` moved by up to half of itself in either direction
pub fn jitter_half(base: Duration) -> Duration {
    uniform(base / 2, base + base / 2)
}
