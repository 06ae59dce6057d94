/*!
Stochastic primitives.

Every random decision in a run goes through one [`RandomSource`]. A source is
deterministic given its seed, and the experiment driver derives one
independent source per task from `(seed, cell, replicate)`, using the ChaCha
stream parameter, so concurrently executing runs never share generator state.
 */

use bitvec::vec::BitVec;
use rand::distributions::{Distribution, WeightedError, WeightedIndex};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::Gumbel;

use crate::error::{Result, SimulationError};
use crate::probability::Probability;

pub struct RandomSource {
    rng: ChaCha8Rng,
}

impl RandomSource {
    pub fn seed_from(seed: u64) -> Self {
        RandomSource {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// The source for replicate `replicate` of parameter combination `cell`.
    /// Distinct `(cell, replicate)` pairs get disjoint streams of the same
    /// seeded generator.
    pub fn for_task(seed: u64, cell: usize, replicate: usize) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        rng.set_stream(((cell as u64) << 32) | (replicate as u64 & 0xffff_ffff));
        RandomSource { rng }
    }

    /// A draw from Uniform[0, 1).
    pub fn uniform(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    pub fn bernoulli(&mut self, p: Probability) -> bool {
        self.rng.gen_bool(p.value())
    }

    /// `n` independent Bernoulli(p) events, as a mask.
    pub fn bernoulli_mask(&mut self, n: usize, p: Probability) -> BitVec {
        (0..n).map(|_| self.bernoulli(p)).collect()
    }

    /// A uniformly random index in `0..n`.
    pub fn below(&mut self, n: usize) -> Result<usize> {
        if n == 0 {
            return Err(SimulationError::DegenerateDistribution);
        }
        Ok(self.rng.gen_range(0..n))
    }

    pub fn sample_with_replacement(&mut self, n: usize, k: usize) -> Result<Vec<usize>> {
        if n == 0 && k > 0 {
            return Err(SimulationError::DegenerateDistribution);
        }
        Ok((0..k).map(|_| self.rng.gen_range(0..n)).collect())
    }

    pub fn sample_without_replacement(&mut self, n: usize, k: usize) -> Result<Vec<usize>> {
        if k > n {
            return Err(SimulationError::configuration(format!(
                "cannot draw {} distinct items from {}",
                k, n
            )));
        }
        Ok(rand::seq::index::sample(&mut self.rng, n, k).into_vec())
    }

    /// One index drawn with probability proportional to `weights`. Zero-weight
    /// items are never chosen.
    pub fn categorical(&mut self, weights: &[f64]) -> Result<usize> {
        Ok(weighted_index(weights)?.sample(&mut self.rng))
    }

    /// `k` indices drawn with replacement, proportional to `weights`.
    pub fn weighted_sample(&mut self, weights: &[f64], k: usize) -> Result<Vec<usize>> {
        let distribution = weighted_index(weights)?;
        Ok((0..k).map(|_| distribution.sample(&mut self.rng)).collect())
    }

    /// A Gumbel draw, `z = μ − σ·ln(−ln(U))`.
    pub fn gumbel(&mut self, location: f64, scale: f64) -> Result<f64> {
        Ok(gumbel(location, scale)?.sample(&mut self.rng))
    }

    pub fn gumbel_vec(&mut self, n: usize, location: f64, scale: f64) -> Result<Vec<f64>> {
        let distribution = gumbel(location, scale)?;
        Ok((0..n).map(|_| distribution.sample(&mut self.rng)).collect())
    }
}

fn weighted_index(weights: &[f64]) -> Result<WeightedIndex<f64>> {
    WeightedIndex::new(weights).map_err(|e| match e {
        WeightedError::NoItem | WeightedError::AllWeightsZero => {
            SimulationError::DegenerateDistribution
        }
        other => SimulationError::configuration(format!("invalid sampling weights: {}", other)),
    })
}

fn gumbel(location: f64, scale: f64) -> Result<Gumbel<f64>> {
    Gumbel::new(location, scale).map_err(|e| {
        SimulationError::configuration(format!(
            "Gumbel(location {}, scale {}): {}",
            location, scale, e
        ))
    })
}
