//! Deterministic random number generation.
//!
//! RULE: Nothing in the engine may call any platform RNG.
//! All randomness flows through StreamRng instances derived
//! from the master seed in ExplorerConfig.
//!
//! Each concern gets its own stream, seeded from
//! (master_seed XOR slot_index). Trial sampling additionally
//! splits one sub-stream per individual, so:
//!   - Parallel simulation never shares a generator between threads.
//!   - An individual's momentary states are identical for every
//!     scorecard evaluated in a run (common random numbers).

use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;

const SLOT_MIX: u64 = 0x9e37_79b9_7f4a_7c15;
const INDIVIDUAL_MIX: u64 = 0xbf58_476d_1ce4_e5b9;

/// A deterministic RNG for a single stream.
pub struct StreamRng {
    inner: Pcg64Mcg,
}

impl StreamRng {
    /// Create a stream from the master seed and a stable index.
    /// The index must never change once assigned.
    pub fn new(master_seed: u64, stream_index: u64) -> Self {
        let derived_seed = master_seed ^ stream_index.wrapping_mul(SLOT_MIX);
        Self {
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        use rand::RngCore;
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Roll a u64 in [0, n).
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        use rand::RngCore;
        assert!(n > 0, "n must be > 0");
        self.inner.next_u64() % n
    }

    /// Pick an index from a weight table by cumulative roll.
    /// Falls back to the last index when weights sum below 1.
    pub fn weighted_index(&mut self, weights: &[f64]) -> usize {
        let roll = self.next_f64();
        let mut cumulative = 0.0;
        for (i, w) in weights.iter().enumerate() {
            cumulative += w;
            if roll < cumulative {
                return i;
            }
        }
        weights.len().saturating_sub(1)
    }

    /// Standard normal via Box–Muller (cosine branch only).
    pub fn standard_normal(&mut self) -> f64 {
        let u1 = self.next_f64().max(1e-12);
        let u2 = self.next_f64();
        (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
    }

    /// Normal(mean, sd). A non-positive sd returns the mean unchanged.
    pub fn normal(&mut self, mean: f64, sd: f64) -> f64 {
        if sd <= 0.0 {
            return mean;
        }
        mean + sd * self.standard_normal()
    }

    /// Gamma(shape, 1) using Marsaglia–Tsang.
    /// Shapes below 1 are boosted and corrected with U^(1/shape).
    pub fn gamma(&mut self, shape: f64) -> f64 {
        if shape < 1.0 {
            let u = self.next_f64().max(1e-12);
            return self.gamma(shape + 1.0) * u.powf(1.0 / shape);
        }
        let d = shape - 1.0 / 3.0;
        let c = 1.0 / (9.0 * d).sqrt();
        loop {
            let x = self.standard_normal();
            let v = (1.0 + c * x).powi(3);
            if v <= 0.0 {
                continue;
            }
            let u = self.next_f64();
            if u < 1.0 - 0.0331 * x.powi(4) || u.ln() < 0.5 * x * x + d * (1.0 - v + v.ln()) {
                return d * v;
            }
        }
    }

    /// Beta(alpha, beta) as X / (X + Y) with X ~ Gamma(alpha), Y ~ Gamma(beta).
    pub fn beta(&mut self, alpha: f64, beta: f64) -> f64 {
        let x = self.gamma(alpha);
        let y = self.gamma(beta);
        if x + y <= 0.0 {
            return 0.5;
        }
        x / (x + y)
    }
}

/// Stream factory for one run, indexed by stable slot.
#[derive(Debug, Clone, Copy)]
pub struct RngBank {
    master_seed: u64,
}

impl RngBank {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    pub fn for_stream(&self, slot: StreamSlot) -> StreamRng {
        StreamRng::new(self.master_seed, slot as u64)
    }

    /// Sub-stream for one individual within a slot.
    /// Depends only on (seed, slot, index), never on thread scheduling.
    pub fn for_individual(&self, slot: StreamSlot, individual_index: u64) -> StreamRng {
        let seed = self.master_seed
            ^ individual_index
                .wrapping_add(1)
                .wrapping_mul(INDIVIDUAL_MIX);
        StreamRng::new(seed, slot as u64)
    }
}

/// Stable stream slot assignments.
/// NEVER reorder or remove entries. Append only.
/// Reordering changes every stream's seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum StreamSlot {
    Population = 0,
    Traits = 1,
    Trials = 2,
    // Add new streams here. Append only.
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_stream() {
        let bank = RngBank::new(12345);
        let mut a = bank.for_stream(StreamSlot::Trials);
        let mut b = bank.for_stream(StreamSlot::Trials);
        for _ in 0..32 {
            assert_eq!(a.next_f64().to_bits(), b.next_f64().to_bits());
        }
    }

    #[test]
    fn individual_streams_are_distinct() {
        let bank = RngBank::new(7);
        let mut a = bank.for_individual(StreamSlot::Trials, 0);
        let mut b = bank.for_individual(StreamSlot::Trials, 1);
        let xs: Vec<f64> = (0..8).map(|_| a.next_f64()).collect();
        let ys: Vec<f64> = (0..8).map(|_| b.next_f64()).collect();
        assert_ne!(xs, ys, "Neighbouring individuals should not share a stream");
    }

    #[test]
    fn beta_samples_stay_in_unit_interval() {
        let mut rng = RngBank::new(99).for_stream(StreamSlot::Traits);
        for &(a, b) in &[(0.5, 0.5), (3.0, 3.0), (6.0, 2.0), (2.0, 6.0)] {
            for _ in 0..500 {
                let x = rng.beta(a, b);
                assert!((0.0..=1.0).contains(&x), "Beta({a},{b}) produced {x}");
            }
        }
    }

    #[test]
    fn beta_mean_tracks_shape() {
        let mut rng = RngBank::new(2024).for_stream(StreamSlot::Traits);
        let n = 4000;
        let mean: f64 = (0..n).map(|_| rng.beta(6.0, 2.0)).sum::<f64>() / n as f64;
        // E[Beta(6,2)] = 0.75
        assert!((mean - 0.75).abs() < 0.03, "mean={mean:.4}");
    }

    #[test]
    fn zero_sd_normal_is_the_mean() {
        let mut rng = RngBank::new(1).for_stream(StreamSlot::Trials);
        assert_eq!(rng.normal(0.42, 0.0), 0.42);
    }
}
