//! Timing constants and backoff arithmetic (§4.2, §5).

use rand::Rng;
use std::time::Duration;

/// Block-watcher reconnection attempt cadence once fallback is active
/// (§4.2).
pub const RECONNECT_INTERVAL: Duration = Duration::from_secs(30);

/// Polling cadence while the block watcher is in fallback mode (§4.2,
/// §5).
pub const POLL_FALLBACK_INTERVAL: Duration = Duration::from_secs(300);

/// Polling cadence when no watcher has ever been installed (§4.2 "idle-
/// cadence variant").
pub const POLL_IDLE_INTERVAL: Duration = Duration::from_secs(60);

/// Supervised end-to-end bring-up retry budget (§4.2 "Failure model").
pub const BRING_UP_BASE_DELAY: Duration = Duration::from_secs(5);
pub const BRING_UP_MAX_DELAY: Duration = Duration::from_secs(60);
pub const BRING_UP_MULTIPLIER: f64 = 1.5;
pub const BRING_UP_MAX_ATTEMPTS: u32 = 10;

/// Store write-conflict retry jitter bounds (§4.2 "retry once after
/// 100-300ms jitter").
pub const WRITE_CONFLICT_JITTER_MIN: Duration = Duration::from_millis(100);
pub const WRITE_CONFLICT_JITTER_MAX: Duration = Duration::from_millis(300);

/// Delay before bring-up attempt number `attempt` (0-indexed), capped at
/// [`BRING_UP_MAX_DELAY`].
#[must_use]
pub fn bring_up_backoff(attempt: u32) -> Duration {
    let base = BRING_UP_BASE_DELAY.as_secs_f64();
    let scaled = base * BRING_UP_MULTIPLIER.powi(attempt as i32);
    Duration::from_secs_f64(scaled.min(BRING_UP_MAX_DELAY.as_secs_f64()))
}

/// A random jitter delay in [100ms, 300ms) for a single store
/// write-conflict retry.
pub fn write_conflict_jitter() -> Duration {
    let min = WRITE_CONFLICT_JITTER_MIN.as_millis() as u64;
    let max = WRITE_CONFLICT_JITTER_MAX.as_millis() as u64;
    Duration::from_millis(rand::thread_rng().gen_range(min..max))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_starts_at_base_delay() {
        assert_eq!(bring_up_backoff(0), BRING_UP_BASE_DELAY);
    }

    #[test]
    fn backoff_grows_by_multiplier() {
        let d1 = bring_up_backoff(1).as_secs_f64();
        assert!((d1 - 7.5).abs() < 0.01);
    }

    #[test]
    fn backoff_caps_at_max_delay() {
        let d = bring_up_backoff(20);
        assert_eq!(d, BRING_UP_MAX_DELAY);
    }

    #[test]
    fn jitter_stays_within_bounds() {
        for _ in 0..50 {
            let j = write_conflict_jitter();
            assert!(j >= WRITE_CONFLICT_JITTER_MIN);
            assert!(j < WRITE_CONFLICT_JITTER_MAX);
        }
    }
}
