//! Poll delay with multiplicative backoff

use std::time::Duration;

use crate::config::ResolverConfig;

/// Delay between poll cycles
///
/// Grows by a fixed factor each idle cycle, never beyond the maximum, and
/// drops back to the minimum on a wake or a resolution. Starts at the
/// maximum so an idle process does not hammer the farm before anyone
/// wakes the resolver.
#[derive(Debug, Clone)]
pub(crate) struct Backoff {
    delay: Duration,
    min: Duration,
    max: Duration,
    factor: f64,
}

impl Backoff {
    pub(crate) fn new(config: &ResolverConfig) -> Self {
        Self {
            delay: config.max_delay,
            min: config.min_delay,
            max: config.max_delay,
            factor: config.backoff_factor,
        }
    }

    /// Grows the delay and returns the new value
    pub(crate) fn grow(&mut self) -> Duration {
        self.delay = self.delay.mul_f64(self.factor).min(self.max);
        self.delay
    }

    pub(crate) fn reset(&mut self) {
        self.delay = self.min;
    }

    pub(crate) fn current(&self) -> Duration {
        self.delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backoff() -> Backoff {
        Backoff::new(&ResolverConfig::default())
    }

    #[test]
    fn test_starts_at_max() {
        let mut backoff = backoff();
        assert_eq!(backoff.current(), Duration::from_secs(2));
        assert_eq!(backoff.grow(), Duration::from_secs(2));
    }

    #[test]
    fn test_grows_strictly_until_clamped() {
        let mut backoff = backoff();
        backoff.reset();
        assert_eq!(backoff.current(), Duration::from_millis(100));

        let mut previous = backoff.current();
        let mut reached_max = false;
        for _ in 0..100 {
            let next = backoff.grow();
            assert!(next <= Duration::from_secs(2));
            if reached_max {
                assert_eq!(next, Duration::from_secs(2));
            } else {
                assert!(next > previous);
                reached_max = next == Duration::from_secs(2);
            }
            previous = next;
        }
        assert!(reached_max);
    }

    #[test]
    fn test_first_growth_uses_factor() {
        let mut backoff = backoff();
        backoff.reset();
        let grown = backoff.grow();
        assert_eq!(grown, Duration::from_millis(100).mul_f64(1.15));
    }

    #[test]
    fn test_reset_after_growth() {
        let mut backoff = backoff();
        backoff.reset();
        backoff.grow();
        backoff.grow();
        backoff.reset();
        assert_eq!(backoff.current(), Duration::from_millis(100));
    }
}
