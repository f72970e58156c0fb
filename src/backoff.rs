use std::time::Duration;

use rand::Rng;

const BASE_DELAY_MS: u64 = 500;
const MAX_BACKOFF_EXPONENT: u32 = 16;
const JITTER_FACTOR: f64 = 0.25;

/// Exponential base delay for a 1-based attempt: `0.5s * 2^(attempt-1)`.
pub(crate) fn base_delay(attempt: usize) -> Duration {
    let exponent = u32::try_from(attempt.saturating_sub(1))
        .unwrap_or(u32::MAX)
        .min(MAX_BACKOFF_EXPONENT);
    Duration::from_millis(BASE_DELAY_MS.saturating_mul(1u64 << exponent))
}

/// Delay before the attempt following `attempt`.
///
/// A server `Retry-After` hint is used verbatim. Otherwise the base delay gets
/// up to 25% of random jitter on top, so the result is never below the base.
pub(crate) fn retry_delay(attempt: usize, retry_after: Option<Duration>) -> Duration {
    if let Some(hint) = retry_after {
        return hint;
    }
    let base = base_delay(attempt);
    base + jitter(base)
}

fn jitter(base: Duration) -> Duration {
    let range = base.as_secs_f64() * JITTER_FACTOR;
    if range <= 0.0 {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(rand::thread_rng().gen_range(0.0..range))
}
