//! Random draws used by the simulator.
//!
//! Every draw a run makes goes through [`Sampler`], so a run is fully
//! determined by its configuration and the sampler's sequence. The seeded
//! implementation is what the binary uses; tests script the draws.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp};

use crate::error::{SimError, SimResult};

pub const MEMORY_DEMAND_RANGE: std::ops::RangeInclusive<u32> = 1..=10;
pub const INSTRUCTIONS_RANGE: std::ops::RangeInclusive<u32> = 1..=10;
pub const WAIT_DURATION_RANGE: std::ops::RangeInclusive<u32> = 1..=5;

pub trait Sampler {
    /// Gap until the next arrival, exponential with the given mean.
    fn interarrival(&mut self, mean: f64) -> SimResult<f64>;

    /// Memory units a new process asks for.
    fn memory_demand(&mut self) -> u32;

    /// Instructions a new process must execute.
    fn instructions(&mut self) -> u32;

    /// Uniform draw in `1..=total` selecting the post-quantum branch.
    fn branch_draw(&mut self, total: u32) -> u32;

    /// Length of a waiting excursion.
    fn wait_duration(&mut self) -> f64;
}

/// `StdRng`-backed sampler; identical seeds give identical sequences.
#[derive(Debug, Clone)]
pub struct SeededSampler {
    rng: StdRng,
}

impl SeededSampler {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Sampler for SeededSampler {
    fn interarrival(&mut self, mean: f64) -> SimResult<f64> {
        let exp = Exp::new(1.0 / mean).map_err(|_| SimError::InvalidTime(mean))?;
        Ok(exp.sample(&mut self.rng))
    }

    fn memory_demand(&mut self) -> u32 {
        self.rng.random_range(MEMORY_DEMAND_RANGE)
    }

    fn instructions(&mut self) -> u32 {
        self.rng.random_range(INSTRUCTIONS_RANGE)
    }

    fn branch_draw(&mut self, total: u32) -> u32 {
        self.rng.random_range(1..=total.max(1))
    }

    fn wait_duration(&mut self) -> f64 {
        f64::from(self.rng.random_range(WAIT_DURATION_RANGE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = SeededSampler::new(7);
        let mut b = SeededSampler::new(7);
        for _ in 0..50 {
            assert_eq!(a.interarrival(10.0).unwrap(), b.interarrival(10.0).unwrap());
            assert_eq!(a.memory_demand(), b.memory_demand());
            assert_eq!(a.branch_draw(21), b.branch_draw(21));
        }
    }

    #[test]
    fn test_draws_stay_in_range() {
        let mut s = SeededSampler::new(42);
        for _ in 0..500 {
            assert!(MEMORY_DEMAND_RANGE.contains(&s.memory_demand()));
            assert!(INSTRUCTIONS_RANGE.contains(&s.instructions()));
            let r = s.branch_draw(21);
            assert!((1..=21).contains(&r));
            let w = s.wait_duration();
            assert!((1.0..=5.0).contains(&w) && w.fract() == 0.0);
            let gap = s.interarrival(10.0).unwrap();
            assert!(gap.is_finite() && gap >= 0.0);
        }
    }

    #[test]
    fn test_interarrival_mean_is_close() {
        let mut s = SeededSampler::new(1);
        let n = 20_000;
        let total: f64 = (0..n).map(|_| s.interarrival(4.0).unwrap()).sum();
        let mean = total / n as f64;
        assert!((mean - 4.0).abs() < 0.2, "mean was {}", mean);
    }

    #[test]
    fn test_invalid_mean_rejected() {
        let mut s = SeededSampler::new(1);
        assert!(s.interarrival(-1.0).is_err());
    }
}
