//! Virtual clocks.
use std::time::Duration;

use crate::constants::NANOS_IN_SECOND;

/// Accumulating clock that converts elapsed wall time into whole cycles.
///
/// It is designed to work with the cooperative tick pattern of the
/// scheduler. The caller reports the time elapsed since the previous tick,
/// and then consumes as many cycles as have accumulated. Leftover time
/// carries over to the next tick, so the cycle rate stays independent of
/// how often the caller ticks.
#[derive(Debug, Clone)]
pub(crate) struct Clock {
    period: Duration,
    accumulator: Duration,
}

impl Clock {
    /// Creates a clock with the given cycle period.
    ///
    /// The period must be non-zero, otherwise `tick` never runs out of cycles.
    pub(crate) fn new(period: Duration) -> Self {
        debug_assert!(!period.is_zero());
        Self {
            period,
            accumulator: Duration::ZERO,
        }
    }

    /// Creates a clock that ticks the given number of times per second.
    pub(crate) fn from_frequency(freq: u64) -> Self {
        Self::new(Duration::from_nanos(NANOS_IN_SECOND / freq.max(1)))
    }

    pub(crate) fn set_period(&mut self, period: Duration) {
        debug_assert!(!period.is_zero());
        self.period = period;
    }

    /// Time accumulated but not yet consumed by cycles.
    pub(crate) fn accumulated(&self) -> Duration {
        self.accumulator
    }

    /// Add elapsed wall time.
    #[inline]
    pub(crate) fn advance(&mut self, delta: Duration) {
        self.accumulator = self.accumulator.saturating_add(delta);
    }

    /// Consume one cycle if enough time has accumulated.
    #[inline]
    pub(crate) fn tick(&mut self) -> bool {
        if self.accumulator >= self.period {
            self.accumulator -= self.period;
            true
        } else {
            false
        }
    }

    /// Set the clock state back to zero.
    pub(crate) fn reset(&mut self) {
        self.accumulator = Duration::ZERO;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_accumulate() {
        let mut clock = Clock::new(Duration::from_millis(10));

        clock.advance(Duration::from_millis(25));
        assert!(clock.tick());
        assert!(clock.tick());
        assert!(!clock.tick());
        assert_eq!(clock.accumulated(), Duration::from_millis(5));

        // Leftover carries into the next tick.
        clock.advance(Duration::from_millis(5));
        assert!(clock.tick());
        assert!(!clock.tick());
    }

    #[test]
    fn test_from_frequency() {
        let clock = Clock::from_frequency(60);
        assert_eq!(clock.period.as_millis(), 16);
    }
}
