//! Randomised backoff between fetch attempts.
//!
//! Unlike an exponential schedule, the delay before each retry is drawn
//! uniformly from a fixed window. Jittered, human-scale pauses are less
//! likely to trip a storefront's stricter rate limiting than a regular
//! cadence.
//!
//! | Attempt | Sleep before attempt |
//! |---------|----------------------|
//! | 0 (initial) | none |
//! | 1 | uniform in `[min, max]` |
//! | 2 | uniform in `[min, max]` |

use std::time::Duration;

use rand::Rng;

/// Window the inter-attempt delay is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub min: Duration,
    pub max: Duration,
}

impl BackoffPolicy {
    /// Builds a policy; bounds given in the wrong order are swapped.
    #[must_use]
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    /// No delay at all.
    #[must_use]
    pub fn none() -> Self {
        Self {
            min: Duration::ZERO,
            max: Duration::ZERO,
        }
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            min: Duration::from_secs(2),
            max: Duration::from_secs(5),
        }
    }
}

/// Draws one delay uniformly from `policy`'s window, at millisecond
/// resolution.
pub fn backoff_delay<R: Rng + ?Sized>(rng: &mut R, policy: &BackoffPolicy) -> Duration {
    let lo = u64::try_from(policy.min.as_millis()).unwrap_or(u64::MAX);
    let hi = u64::try_from(policy.max.as_millis()).unwrap_or(u64::MAX);
    if hi <= lo {
        return Duration::from_millis(lo);
    }
    Duration::from_millis(rng.random_range(lo..=hi))
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn default_window_is_two_to_five_seconds() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.min, Duration::from_secs(2));
        assert_eq!(policy.max, Duration::from_secs(5));
    }

    #[test]
    fn delays_stay_inside_window() {
        let mut rng = StdRng::seed_from_u64(11);
        let policy = BackoffPolicy::default();
        for _ in 0..200 {
            let d = backoff_delay(&mut rng, &policy);
            assert!(d >= policy.min && d <= policy.max, "out of window: {d:?}");
        }
    }

    #[test]
    fn delays_are_jittered() {
        let mut rng = StdRng::seed_from_u64(12);
        let policy = BackoffPolicy::default();
        let first = backoff_delay(&mut rng, &policy);
        let varied = (0..20).any(|_| backoff_delay(&mut rng, &policy) != first);
        assert!(varied, "expected jitter across draws");
    }

    #[test]
    fn zero_window_never_sleeps() {
        let mut rng = StdRng::seed_from_u64(13);
        assert_eq!(
            backoff_delay(&mut rng, &BackoffPolicy::none()),
            Duration::ZERO
        );
    }

    #[test]
    fn reversed_bounds_are_swapped() {
        let policy = BackoffPolicy::new(Duration::from_secs(5), Duration::from_secs(2));
        assert_eq!(policy, BackoffPolicy::default());
    }

    #[test]
    fn same_seed_same_schedule() {
        let policy = BackoffPolicy::default();
        let mut a = StdRng::seed_from_u64(99);
        let mut b = StdRng::seed_from_u64(99);
        for _ in 0..5 {
            assert_eq!(backoff_delay(&mut a, &policy), backoff_delay(&mut b, &policy));
        }
    }
}
