use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

/// Fixed-interval throttle for outbound search requests
///
/// Holds a single process-wide "last request" instant. A caller arriving less
/// than `min_interval` after the last request sleeps until the interval has
/// elapsed, then records the current instant and proceeds. The lock only guards
/// reading and writing the instant, not the wait: concurrent callers that wake
/// on the same deadline all proceed.
#[derive(Debug)]
pub struct SearchThrottle {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl SearchThrottle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    /// How long a caller arriving at `now` would have to wait
    fn remaining(&self, now: Instant) -> Duration {
        let last = *self
            .last_request
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        match last {
            Some(last) => self.min_interval.saturating_sub(now.duration_since(last)),
            None => Duration::ZERO,
        }
    }

    /// Waits out the remainder of the interval, then stamps the last request time
    pub async fn wait(&self) {
        let delay = self.remaining(Instant::now());
        if !delay.is_zero() {
            tracing::debug!(delay_ms = delay.as_millis() as u64, "Throttling search request");
            tokio::time::sleep(delay).await;
        }

        *self
            .last_request
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(Instant::now());
    }
}

impl Default for SearchThrottle {
    fn default() -> Self {
        Self::new(Duration::from_millis(350))
    }
}
