//! Jittered exponential backoff between retries.

use std::time::Duration;

use rand::Rng;

/// Delay before retry number `retry` (1-based).
///
/// Doubles from `base` on each retry and stops growing at `ceiling`; a
/// random jitter of up to a tenth of that delay is added on top. Retry 0
/// waits nothing.
pub fn retry_delay(retry: u32, base: Duration, ceiling: Duration) -> Duration {
    let Some(doublings) = retry.checked_sub(1) else {
        return Duration::ZERO;
    };
    let factor = 1u32.checked_shl(doublings).unwrap_or(u32::MAX);
    let delay = base.saturating_mul(factor).min(ceiling);
    delay + jitter(delay / 10)
}

fn jitter(spread: Duration) -> Duration {
    if spread.is_zero() {
        Duration::ZERO
    } else {
        rand::thread_rng().gen_range(Duration::ZERO..spread)
    }
}
