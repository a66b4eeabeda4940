//! # Randomized Exponential Backoff
//!
//! Wait intervals for the polling loops. Step `i` draws a uniformly random
//! wait from `[0, 2^(i+1) - 1)` seconds; the factor stops doubling at the
//! ceiling step, which bounds the longest single wait.
//!
//! A schedule is finite: it always yields at least `min_count` waits and
//! keeps going until their sum reaches `min_duration`, so a loop driven by it
//! has both a minimum number of attempts and a minimum total patience no
//! matter how the draws fall.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

/// Highest step at which the growth factor may still double; larger
/// ceilings are clamped to it, bounding a single wait at about 136 years.
pub const MAX_CEILING: u32 = 32;

/// Parameters of a backoff schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Minimum number of waits to produce
    pub min_count: u32,
    /// Minimum cumulative wait before the schedule may end
    pub min_duration: Duration,
    /// Step index after which the growth factor stops doubling
    pub ceiling: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            min_count: 5,
            min_duration: Duration::ZERO,
            ceiling: 10,
        }
    }
}

impl BackoffPolicy {
    /// Create a policy with explicit parameters
    #[must_use]
    pub fn new(min_count: u32, min_duration: Duration, ceiling: u32) -> Self {
        Self {
            min_count,
            min_duration,
            ceiling,
        }
    }

    /// Fresh schedule seeded from OS entropy
    #[must_use]
    pub fn schedule(&self) -> Backoff {
        self.schedule_with_rng(StdRng::from_entropy())
    }

    /// Fresh schedule drawing from the given generator
    pub fn schedule_with_rng<R: Rng>(&self, rng: R) -> Backoff<R> {
        Backoff {
            policy: *self,
            rng,
            step: 0,
            factor: 2.0,
            total: Duration::ZERO,
        }
    }
}

/// One polling loop's sequence of waits
///
/// Not shared between loops; build a new one from the policy each time.
#[derive(Debug)]
pub struct Backoff<R = StdRng> {
    policy: BackoffPolicy,
    rng: R,
    step: u32,
    factor: f64,
    total: Duration,
}

impl<R> Backoff<R> {
    /// Number of waits produced so far
    pub fn steps(&self) -> u32 {
        self.step
    }

    /// Sum of the waits produced so far
    pub fn total(&self) -> Duration {
        self.total
    }
}

impl<R: Rng> Iterator for Backoff<R> {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.step >= self.policy.min_count && self.total >= self.policy.min_duration {
            return None;
        }

        let drawn = self.rng.gen_range(0.0..self.factor - 1.0);
        let wait = Duration::try_from_secs_f64(drawn).unwrap_or(Duration::MAX);
        self.total = self.total.saturating_add(wait);
        if self.step + 1 < self.policy.ceiling.min(MAX_CEILING) {
            self.factor *= 2.0;
        }
        self.step += 1;

        Some(wait)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(policy: BackoffPolicy, seed: u64) -> Backoff<StdRng> {
        policy.schedule_with_rng(StdRng::seed_from_u64(seed))
    }

    #[test]
    fn test_zero_duration_yields_exactly_min_count() {
        for min_count in 0..20 {
            for seed in 0..5 {
                let policy = BackoffPolicy::new(min_count, Duration::ZERO, 10);
                assert_eq!(seeded(policy, seed).count(), min_count as usize);
            }
        }
    }

    #[test]
    fn test_default_policy_yields_five_waits() {
        assert_eq!(BackoffPolicy::default().schedule().count(), 5);
    }

    #[test]
    fn test_min_duration_is_reached() {
        for secs in [1, 10, 60, 300, 3600] {
            for seed in 0..10 {
                let min_duration = Duration::from_secs(secs);
                let policy = BackoffPolicy::new(1, min_duration, 10);
                let total: Duration = seeded(policy, seed).sum();
                assert!(total >= min_duration, "total {total:?} below {min_duration:?}");
            }
        }
    }

    #[test]
    fn test_min_duration_stops_once_reached() {
        let policy = BackoffPolicy::new(1, Duration::from_secs(100), 10);
        let mut schedule = seeded(policy, 7);
        while schedule.next().is_some() {}
        let before_last = schedule.total();
        assert!(before_last >= Duration::from_secs(100));
        assert!(schedule.next().is_none());
    }

    #[test]
    fn test_growth_stops_at_ceiling() {
        let policy = BackoffPolicy::new(10_000, Duration::ZERO, 10);
        let waits: Vec<Duration> = seeded(policy, 42).collect();
        assert_eq!(waits.len(), 10_000);

        let cap = Duration::from_secs(1023);
        assert!(waits.iter().all(|w| *w < cap));
        assert!(waits.iter().skip(10).any(|w| *w > Duration::from_secs(1020)));
    }

    #[test]
    fn test_early_steps_are_bounded_by_growth_factor() {
        let policy = BackoffPolicy::new(4, Duration::ZERO, 10);
        for seed in 0..50 {
            let waits: Vec<Duration> = seeded(policy, seed).collect();
            assert!(waits[0] < Duration::from_secs(1));
            assert!(waits[1] < Duration::from_secs(3));
            assert!(waits[2] < Duration::from_secs(7));
            assert!(waits[3] < Duration::from_secs(15));
        }
    }

    #[test]
    fn test_low_ceiling_caps_factor_early() {
        // ceiling 2: factor doubles once (2 -> 4) and then stays at 4
        let policy = BackoffPolicy::new(1_000, Duration::ZERO, 2);
        let waits: Vec<Duration> = seeded(policy, 3).collect();
        assert!(waits.iter().all(|w| *w < Duration::from_secs(3)));
    }

    #[test]
    fn test_large_ceiling_is_clamped() {
        let policy = BackoffPolicy::new(100, Duration::ZERO, 100);
        let schedule = seeded(policy, 1);
        let waits: Vec<Duration> = schedule.collect();
        assert_eq!(waits.len(), 100);

        let cap = Duration::from_secs(1u64 << MAX_CEILING);
        assert!(waits.iter().all(|w| *w < cap));
    }

    #[test]
    fn test_clamped_ceiling_keeps_total_finite() {
        let policy = BackoffPolicy::new(10_000, Duration::MAX, u32::MAX);
        let mut schedule = seeded(policy, 9);
        for _ in 0..10_000 {
            assert!(schedule.next().is_some());
        }
        assert!(schedule.total() > Duration::from_secs(1u64 << 40));
    }

    #[test]
    fn test_schedules_are_independent() {
        let policy = BackoffPolicy::new(3, Duration::ZERO, 10);
        let mut first = policy.schedule();
        first.next();
        first.next();
        assert_eq!(first.steps(), 2);

        let second = policy.schedule();
        assert_eq!(second.steps(), 0);
        assert_eq!(second.count(), 3);
    }
}
