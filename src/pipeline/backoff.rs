use std::time::Duration;
use tokio::time::sleep;

/// Delay applied after a failed fetch before the pass returns
///
/// Doubles per consecutive failure up to `max`; with `initial == max` it is a
/// fixed wait. Never gives up: the next tick always retries.
#[derive(Debug)]
pub struct FetchBackoff {
    initial: Duration,
    max: Duration,
    consecutive_failures: u32,
}

impl FetchBackoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max: max.max(initial),
            consecutive_failures: 0,
        }
    }

    pub fn fixed(delay: Duration) -> Self {
        Self::new(delay, delay)
    }

    /// Delay for the next failure, without recording it
    pub fn next_delay(&self) -> Duration {
        let factor = 2_u32.saturating_pow(self.consecutive_failures.min(16));
        self.initial.saturating_mul(factor).min(self.max)
    }

    pub async fn sleep(&mut self) {
        let delay = self.next_delay();
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);

        log::warn!(
            "⏳ Fetch failed {} time(s) in a row, backing off {}ms",
            self.consecutive_failures,
            delay.as_millis()
        );

        sleep(delay).await;
    }

    pub fn reset(&mut self) {
        self.consecutive_failures = 0;
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }
}
