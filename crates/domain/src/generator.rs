//! State generators: compute the next simulated value from the previous one.
//!
//! Generators are pure functions of their bounds, the previous value and a
//! caller-provided random source. Devices keep one persistent generator
//! seeded at creation, so a fixed seed yields a reproducible sequence.

use std::ops::Neg;
use std::time::Duration;

use rand::Rng;
use rand::distributions::uniform::SampleUniform;

/// A numeric reading a [`StepRange`] can drive (`f64` or `i64`).
pub trait Reading: Copy + PartialOrd + SampleUniform + Neg<Output = Self> {
    /// Add `delta`, stopping at the numeric limits of the type instead of
    /// overflowing.
    #[must_use]
    fn saturating_add(self, delta: Self) -> Self;
}

impl Reading for f64 {
    fn saturating_add(self, delta: Self) -> Self {
        self + delta
    }
}

impl Reading for i64 {
    fn saturating_add(self, delta: Self) -> Self {
        i64::saturating_add(self, delta)
    }
}

/// Bounds and step magnitudes of a random walk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepRange<T> {
    pub min: T,
    pub max: T,
    pub min_step: T,
    pub max_step: T,
}

impl<T: Reading> StepRange<T> {
    /// Draw a step magnitude in `[min_step, max_step]`, give it a random
    /// sign, apply it to `current` and clamp the result to `[min, max]`.
    pub fn next<R: Rng + ?Sized>(&self, current: T, rng: &mut R) -> T {
        let magnitude = if self.min_step < self.max_step {
            rng.gen_range(self.min_step..=self.max_step)
        } else {
            self.min_step
        };
        let delta = if rng.gen_bool(0.5) {
            magnitude
        } else {
            -magnitude
        };
        clamp(current.saturating_add(delta), self.min, self.max)
    }

    /// Whether `value` lies within `[min, max]`.
    pub fn contains(&self, value: T) -> bool {
        self.min <= value && value <= self.max
    }
}

fn clamp<T: PartialOrd>(value: T, min: T, max: T) -> T {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

/// Pick a uniformly random index in `0..len`.
///
/// Returns `None` for an empty list; configuration validation guarantees
/// this never happens for a running device.
pub fn pick_index<R: Rng + ?Sized>(len: usize, rng: &mut R) -> Option<usize> {
    (len > 0).then(|| rng.gen_range(0..len))
}

/// Draw a whole number of seconds in `[min, max]`.
pub fn sample_period<R: Rng + ?Sized>(min: Duration, max: Duration, rng: &mut R) -> Duration {
    let (low, high) = (min.as_secs(), max.as_secs());
    if low >= high {
        return min;
    }
    Duration::from_secs(rng.gen_range(low..=high))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn should_stay_within_bounds_when_starting_at_maximum() {
        let range = StepRange {
            min: 0.0,
            max: 10.0,
            min_step: 5.0,
            max_step: 5.0,
        };
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..100 {
            let next = range.next(10.0, &mut rng);
            assert!(next == 5.0 || next == 10.0, "unexpected {next}");
        }
    }

    #[test]
    fn should_keep_value_when_step_range_is_zero() {
        let range = StepRange {
            min: 0,
            max: 100,
            min_step: 0,
            max_step: 0,
        };
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(range.next(42, &mut rng), 42);
    }

    #[test]
    fn should_move_by_at_least_min_step_when_not_clamped() {
        let range = StepRange {
            min: -1000.0,
            max: 1000.0,
            min_step: 0.5,
            max_step: 1.5,
        };
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..100 {
            let delta = (range.next(0.0, &mut rng)).abs();
            assert!((0.5..=1.5).contains(&delta), "delta {delta}");
        }
    }

    #[test]
    fn should_saturate_instead_of_overflowing_near_integer_limits() {
        let range = StepRange {
            min: 0i64,
            max: i64::MAX,
            min_step: 10,
            max_step: 10,
        };
        let mut rng = StdRng::seed_from_u64(4);
        for _ in 0..50 {
            let next = range.next(i64::MAX - 1, &mut rng);
            assert!(next == i64::MAX || next == i64::MAX - 11, "unexpected {next}");
        }

        let range = StepRange {
            min: i64::MIN,
            max: 0,
            min_step: 10,
            max_step: 10,
        };
        for _ in 0..50 {
            let next = range.next(i64::MIN + 1, &mut rng);
            assert!(next == i64::MIN || next == i64::MIN + 11, "unexpected {next}");
        }
    }

    #[test]
    fn should_return_none_when_picking_from_empty_list() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(pick_index(0, &mut rng), None);
    }

    #[test]
    fn should_produce_same_sequence_for_same_seed() {
        let range = StepRange {
            min: 0.0,
            max: 50.0,
            min_step: 0.1,
            max_step: 2.0,
        };
        let mut a = StdRng::seed_from_u64(77);
        let mut b = StdRng::seed_from_u64(77);
        let (mut va, mut vb) = (25.0, 25.0);
        for _ in 0..20 {
            va = range.next(va, &mut a);
            vb = range.next(vb, &mut b);
            assert!((va - vb).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn should_return_min_period_when_range_is_degenerate() {
        let mut rng = StdRng::seed_from_u64(0);
        let period = sample_period(Duration::from_secs(4), Duration::from_secs(4), &mut rng);
        assert_eq!(period, Duration::from_secs(4));
    }

    proptest! {
        #[test]
        fn float_walk_never_leaves_bounds(
            seed in any::<u64>(),
            min in -100.0f64..100.0,
            width in 0.0f64..50.0,
            min_step in 0.0f64..10.0,
            extra_step in 0.0f64..10.0,
            ticks in 1usize..200,
        ) {
            let range = StepRange { min, max: min + width, min_step, max_step: min_step + extra_step };
            let mut rng = StdRng::seed_from_u64(seed);
            let mut value = min;
            for _ in 0..ticks {
                value = range.next(value, &mut rng);
                prop_assert!(range.contains(value));
            }
        }

        #[test]
        fn integer_walk_never_leaves_bounds(
            seed in any::<u64>(),
            min in -1000i64..1000,
            width in 0i64..500,
            min_step in 0i64..50,
            extra_step in 0i64..50,
            ticks in 1usize..200,
        ) {
            let range = StepRange { min, max: min + width, min_step, max_step: min_step + extra_step };
            let mut rng = StdRng::seed_from_u64(seed);
            let mut value = min + width / 2;
            for _ in 0..ticks {
                value = range.next(value, &mut rng);
                prop_assert!(range.contains(value));
            }
        }

        #[test]
        fn integer_walk_never_overflows_at_type_limits(
            seed in any::<u64>(),
            width in 0i64..1_000,
            min_step in 0i64..1_000,
            extra_step in 0i64..1_000,
            at_top in any::<bool>(),
            ticks in 1usize..100,
        ) {
            let (min, max) = if at_top {
                (i64::MAX - width, i64::MAX)
            } else {
                (i64::MIN, i64::MIN + width)
            };
            let range = StepRange { min, max, min_step, max_step: min_step + extra_step };
            let mut rng = StdRng::seed_from_u64(seed);
            let mut value = if at_top { max } else { min };
            for _ in 0..ticks {
                value = range.next(value, &mut rng);
                prop_assert!(range.contains(value));
            }
        }

        #[test]
        fn picked_index_is_always_valid(seed in any::<u64>(), len in 1usize..32) {
            let mut rng = StdRng::seed_from_u64(seed);
            let index = pick_index(len, &mut rng);
            prop_assert!(matches!(index, Some(i) if i < len));
        }

        #[test]
        fn sampled_period_stays_in_range(seed in any::<u64>(), low in 1u64..30, extra in 0u64..30) {
            let mut rng = StdRng::seed_from_u64(seed);
            let (min, max) = (Duration::from_secs(low), Duration::from_secs(low + extra));
            let period = sample_period(min, max, &mut rng);
            prop_assert!(min <= period && period <= max);
        }
    }
}
