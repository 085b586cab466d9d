//! Backoff calculation for retried operations.
//!
//! Sync-only math; the recognizer adapter applies it with tokio sleeps.

/// Default base delay for the single recognizer retry.
pub const RECOGNIZER_RETRY_DELAY_MS: u64 = 250;

/// Calculate exponential backoff delay.
///
/// Formula: `min(max_delay, base_delay * 2^attempt)`, where `attempt` is the
/// zero-based retry index.
#[must_use]
pub fn backoff_delay_ms(attempt: u32, base_delay_ms: u64, max_delay_ms: u64) -> u64 {
    base_delay_ms
        .saturating_mul(1u64 << attempt.min(31))
        .min(max_delay_ms)
}
