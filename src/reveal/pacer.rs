//! Randomized pacing for reveal steps.

use std::ops::Range;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Upper bound (exclusive) of a single step, as a fraction of what remains.
pub const MAX_STEP_FRACTION: f64 = 0.25;

/// Pause between reveal steps, in milliseconds.
pub const PAUSE_RANGE_MS: Range<u64> = 1000..6000;

/// Source of step sizes and pauses for the reveal loop.
pub trait Pacer: Send + Sync {
    /// Fraction of the remaining extent to advance, in `[0, MAX_STEP_FRACTION)`.
    fn step_fraction(&self) -> f64;

    /// How long to let the page settle after a step.
    fn pause(&self) -> Duration;
}

/// Uniformly random pacing.
///
/// Step fractions are drawn from `[0, 1)` and redrawn until they fall below
/// [`MAX_STEP_FRACTION`]; pauses are uniform over [`PAUSE_RANGE_MS`].
pub struct RandomPacer {
    rng: Mutex<StdRng>,
}

impl RandomPacer {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Deterministic pacer for reproducible runs.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for RandomPacer {
    fn default() -> Self {
        Self::new()
    }
}

impl Pacer for RandomPacer {
    fn step_fraction(&self) -> f64 {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            let fraction: f64 = rng.random();
            if fraction < MAX_STEP_FRACTION {
                return fraction;
            }
        }
    }

    fn pause(&self) -> Duration {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        Duration::from_millis(rng.random_range(PAUSE_RANGE_MS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_fraction_range() {
        let pacer = RandomPacer::seeded(7);
        for _ in 0..1000 {
            let f = pacer.step_fraction();
            assert!((0.0..MAX_STEP_FRACTION).contains(&f), "fraction {}", f);
        }
    }

    #[test]
    fn test_pause_range() {
        let pacer = RandomPacer::seeded(7);
        for _ in 0..1000 {
            let ms = pacer.pause().as_millis() as u64;
            assert!(PAUSE_RANGE_MS.contains(&ms), "pause {}ms", ms);
        }
    }

    #[test]
    fn test_seeded_pacers_agree() {
        let a = RandomPacer::seeded(42);
        let b = RandomPacer::seeded(42);
        for _ in 0..20 {
            assert_eq!(a.step_fraction(), b.step_fraction());
            assert_eq!(a.pause(), b.pause());
        }
    }
}
