//! Retry with exponential backoff for the blocking HTTP transport.

use std::time::Duration;
use rand::{thread_rng, Rng};
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    pub max_retries: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter: f64, // 0.0 - 1.0
}
impl Default for RetryConfig { fn default() -> Self { Self { max_retries: 3, base_delay: Duration::from_millis(100), max_delay: Duration::from_millis(2000), jitter: 0.25 } } }

impl RetryConfig {
    pub fn none() -> Self { Self { max_retries: 0, ..Self::default() } }

    /// Backoff before retry number `attempt + 1`.
    pub fn delay_for(&self, attempt: usize) -> Duration {
        let exp = self.base_delay.mul_f64(2f64.powi(attempt.min(30) as i32));
        let delay = std::cmp::min(exp, self.max_delay);
        if self.jitter <= 0.0 { return delay; }
        let jitter_ms = (delay.as_millis() as f64 * self.jitter.min(1.0)) as i64;
        let offset: i64 = thread_rng().gen_range(-jitter_ms..=jitter_ms);
        Duration::from_millis((delay.as_millis() as i64 + offset).max(0) as u64)
    }
}

/// Runs `op` until it succeeds, fails with an error `retryable` rejects, or retries run out. The
/// last error is returned unchanged.
pub fn retry_blocking<T, E, F, P>(cfg: &RetryConfig, mut op: F, retryable: P) -> Result<T, E>
where
    F: FnMut(usize) -> Result<T, E>,
    P: Fn(&E) -> bool,
{
    let mut attempt = 0;
    loop {
        match op(attempt) {
            Ok(v) => return Ok(v),
            Err(e) if attempt >= cfg.max_retries || !retryable(&e) => return Err(e),
            Err(_) => {
                let delay = cfg.delay_for(attempt);
                debug!(attempt, ?delay, "retrying request");
                std::thread::sleep(delay);
            }
        }
        attempt += 1;
    }
}
