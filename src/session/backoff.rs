use std::time::Duration;

/// Exponential reconnect delay: `min(max, base * 2^attempt)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    base: Duration,
    max: Duration,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    /// Delay before retry number `attempt` (attempts start at 1)
    pub fn delay(&self, attempt: u32) -> Duration {
        let base_ms = self.base.as_millis().min(u64::MAX as u128) as u64;
        let max_ms = self.max.as_millis().min(u64::MAX as u128) as u64;
        let delay_ms = 2u64
            .checked_pow(attempt)
            .and_then(|factor| factor.checked_mul(base_ms))
            .unwrap_or(max_ms);
        Duration::from_millis(delay_ms.min(max_ms))
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(30))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_doubles_until_cap() {
        let backoff = Backoff::default();
        let secs: Vec<u64> = (1..=7).map(|a| backoff.delay(a).as_secs()).collect();
        assert_eq!(secs, vec![2, 4, 8, 16, 30, 30, 30]);
    }

    #[test]
    fn test_delay_is_non_decreasing_and_never_overflows() {
        let backoff = Backoff::default();
        let mut previous = Duration::ZERO;
        for attempt in 0..200 {
            let delay = backoff.delay(attempt);
            assert!(delay >= previous);
            assert!(delay <= Duration::from_secs(30));
            previous = delay;
        }
        assert_eq!(backoff.delay(u32::MAX), Duration::from_secs(30));
    }
}
