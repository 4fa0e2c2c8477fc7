// Stress hooks for multi-lock acquisition.
// Only active when the "stress" feature is enabled; the hooks widen the
// interleavings tests can observe by randomly preempting threads between
// acquisition rounds.

use crate::core::types::ThreadId;

#[cfg(feature = "stress")]
use rand::{Rng, rng};
#[cfg(feature = "stress")]
use std::thread;
#[cfg(feature = "stress")]
use std::time::Duration;

/// Configuration options for stress testing
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Probability of preemption per acquisition round (0.0-1.0)
    pub preemption_probability: f64,
    /// Minimum delay in milliseconds
    pub min_delay_ms: u64,
    /// Maximum delay in milliseconds
    pub max_delay_ms: u64,
}

impl Default for StressConfig {
    fn default() -> Self {
        StressConfig {
            preemption_probability: 0.5,
            min_delay_ms: 1,
            max_delay_ms: 10,
        }
    }
}

#[cfg(feature = "stress")]
lazy_static::lazy_static! {
    static ref STRESS_CONFIG: parking_lot::Mutex<StressConfig> =
        parking_lot::Mutex::new(StressConfig::default());
}

/// Replace the global stress configuration
#[cfg(feature = "stress")]
pub fn set_stress_config(config: StressConfig) {
    *STRESS_CONFIG.lock() = config;
}

/// Apply a random delay to the current thread
#[cfg(feature = "stress")]
pub fn apply_delay(min_ms: u64, max_ms: u64) {
    let mut rng = rng();
    let delay_ms = if min_ms == max_ms {
        min_ms
    } else {
        rng.random_range(min_ms..=max_ms)
    };
    thread::sleep(Duration::from_millis(delay_ms));
}

/// Maybe preempt the current thread before a multi-lock acquisition round
#[cfg(feature = "stress")]
pub(crate) fn on_acquire_round(_thread_id: ThreadId, _round: u32) {
    let config = STRESS_CONFIG.lock().clone();
    let mut rng = rng();
    if rng.random::<f64>() < config.preemption_probability {
        apply_delay(config.min_delay_ms, config.max_delay_ms);
    }
}

#[cfg(not(feature = "stress"))]
pub(crate) fn on_acquire_round(_thread_id: ThreadId, _round: u32) {
    // No-op when stress testing is disabled
}
