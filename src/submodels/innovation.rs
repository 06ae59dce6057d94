use serde_derive::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SimulationError};
use crate::parameters::InnovationParameters;
use crate::population::{Population, Trait};
use crate::probability::Probability;
use crate::random::RandomSource;
use crate::submodels::{copied_traits, UpdateRule};

/**
What happens when innovation would need more labels than the label space
allows.

`Suppress` drops every innovation of the generation that would cross the
capacity (the agents keep their copied traits) and counts the suppressed
generation in the population's fallbacks. `Fail` ends the run with
[`SimulationError::LabelExhaustion`]. `Unbounded` has no capacity besides
the width of [`Trait`], and fails when that is exhausted.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapacityPolicy {
    Unbounded,
    Suppress { capacity: Trait },
    Fail { capacity: Trait },
}

impl Default for CapacityPolicy {
    fn default() -> Self {
        CapacityPolicy::Unbounded
    }
}

impl CapacityPolicy {
    pub fn capacity(&self) -> Option<Trait> {
        match *self {
            CapacityPolicy::Unbounded => None,
            CapacityPolicy::Suppress { capacity } | CapacityPolicy::Fail { capacity } => {
                Some(capacity)
            }
        }
    }
}

/**
Unbiased copying over an open set of traits, with innovation. The first
generation carries traits drawn uniformly from `1..=m`. Every generation each
agent copies a random member of the previous one, and then, with
probability `mu`, replaces what it copied with a trait nobody has had
before. With `mu = 0` this is plain drift among `m` traits.
 */
#[derive(Debug, Clone)]
pub struct MultiTraitInnovation {
    pub m: Trait,
    pub mu: Probability,
    pub capacity: CapacityPolicy,
}

impl MultiTraitInnovation {
    pub fn new(p: &InnovationParameters) -> Result<Self> {
        if p.m < 1 {
            return Err(SimulationError::configuration("m must be at least 1"));
        }
        if let Some(capacity) = p.capacity.capacity() {
            if capacity < p.m {
                return Err(SimulationError::configuration(format!(
                    "label capacity {} is below the {} initial traits",
                    capacity, p.m
                )));
            }
        }
        Ok(MultiTraitInnovation {
            m: p.m,
            mu: Probability::new("mu", p.mu)?,
            capacity: p.capacity,
        })
    }
}

impl UpdateRule for MultiTraitInnovation {
    fn name(&self) -> &'static str {
        "multi_trait_innovation"
    }

    fn initialize(&self, n: usize, rng: &mut RandomSource) -> Result<Population> {
        Population::with_uniform_traits(n, self.m, rng)
    }

    fn next_generation(&self, previous: &Population, rng: &mut RandomSource) -> Result<Population> {
        let mut next = previous.clone();
        let traits = copied_traits(previous, rng)?;
        next.traits_mut().copy_from_slice(&traits);

        let innovators = rng.bernoulli_mask(previous.len(), self.mu);
        let k = innovators.count_ones();
        if k == 0 {
            return Ok(next);
        }
        match next.labels_mut().issue(k, self.capacity.capacity()) {
            Some(fresh) => {
                let fresh: Vec<Trait> = fresh.collect();
                next.assign_traits_from(&innovators, &fresh)?;
            }
            None => match self.capacity {
                CapacityPolicy::Suppress { capacity } => {
                    debug!(
                        innovations = k,
                        capacity,
                        highest = previous.labels().highest(),
                        "label capacity reached, suppressing innovation"
                    );
                    next.fallbacks_mut().suppressed_innovations += 1;
                }
                CapacityPolicy::Fail { capacity } => {
                    return Err(SimulationError::LabelExhaustion { capacity })
                }
                CapacityPolicy::Unbounded => {
                    return Err(SimulationError::LabelExhaustion {
                        capacity: Trait::MAX,
                    })
                }
            },
        }
        Ok(next)
    }
}
