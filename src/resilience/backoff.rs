//! Exponential backoff with jitter.

use rand::Rng;
use std::time::Duration;

/// Delay before retry `attempt` (0-based) without jitter: `base_ms * 2^attempt`.
pub fn base_delay(attempt: u32, base_ms: u64) -> Duration {
    let factor = 2u64.saturating_pow(attempt);
    Duration::from_millis(base_ms.saturating_mul(factor))
}

/// Calculate exponential backoff delay with up to `jitter_ms` of random jitter.
pub fn calculate_backoff(attempt: u32, base_ms: u64, jitter_ms: u64) -> Duration {
    let jitter = if jitter_ms > 0 {
        rand::thread_rng().gen_range(0..jitter_ms)
    } else {
        0
    };

    base_delay(attempt, base_ms).saturating_add(Duration::from_millis(jitter))
}
