//! Send scheduler: a fixed period with a random offset inside each period

use std::time::Duration;

use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Draws the per-round send delay from `[0, period)`.
/// The delay never reaches the period, so a deferred send always fires
/// before the next periodic tick.
pub struct JitterScheduler {
    period: Duration,
    dist: Option<Uniform<u64>>,
    rng: StdRng,
}

impl JitterScheduler {
    pub fn new(period: Duration, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let nanos = period.as_nanos().min(u128::from(u64::MAX)) as u64;
        JitterScheduler {
            period,
            dist: (nanos > 0).then(|| Uniform::new(0, nanos)),
            rng,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Delay until the probe of this round is sent
    pub fn next_delay(&mut self) -> Duration {
        match &self.dist {
            Some(dist) => Duration::from_nanos(dist.sample(&mut self.rng)),
            None => Duration::ZERO,
        }
    }
}
