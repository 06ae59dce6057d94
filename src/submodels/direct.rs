use crate::error::Result;
use crate::parameters::DirectBiasParameters;
use crate::population::{Population, A, B};
use crate::probability::Probability;
use crate::random::RandomSource;
use crate::submodels::{UnbiasedCopy, UpdateRule};

/**
Direct (content) bias. Each agent observes one random demonstrator from the
previous generation. A demonstrator showing A is copied with probability
`s_a`, one showing B with probability `s_b`; otherwise the agent keeps its
previous trait.

Only `s_a - s_b` sets the direction of change. When the two are equal there
is no bias, and the rule delegates to [`UnbiasedCopy`] with the same random
draws.
 */
#[derive(Debug, Clone)]
pub struct DirectBias {
    pub p_0: Probability,
    pub s_a: Probability,
    pub s_b: Probability,
}

impl DirectBias {
    pub fn new(p: &DirectBiasParameters) -> Result<Self> {
        Ok(DirectBias {
            p_0: Probability::new("p_0", p.p_0)?,
            s_a: Probability::new("s_a", p.s_a)?,
            s_b: Probability::new("s_b", p.s_b)?,
        })
    }

    fn unbiased(&self) -> UnbiasedCopy {
        UnbiasedCopy { p_0: self.p_0 }
    }
}

impl UpdateRule for DirectBias {
    fn name(&self) -> &'static str {
        "direct_bias"
    }

    fn initialize(&self, n: usize, rng: &mut RandomSource) -> Result<Population> {
        Population::with_initial_frequency(n, self.p_0, rng)
    }

    fn next_generation(&self, previous: &Population, rng: &mut RandomSource) -> Result<Population> {
        if self.s_a == self.s_b {
            return self.unbiased().next_generation(previous, rng);
        }
        let n = previous.len();
        let demonstrators = rng.sample_with_replacement(n, n)?;
        let mut next = previous.clone();
        for (new, d) in next.traits_mut().iter_mut().zip(demonstrators) {
            let shown = previous.traits()[d];
            if shown == A {
                if rng.bernoulli(self.s_a) {
                    *new = A;
                }
            } else if rng.bernoulli(self.s_b) {
                *new = B;
            }
        }
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_biases_reproduce_unbiased_copy_exactly() {
        let rule = DirectBias::new(&DirectBiasParameters {
            p_0: 0.4,
            s_a: 0.3,
            s_b: 0.3,
        })
        .unwrap();
        let unbiased = rule.unbiased();
        let mut rng1 = RandomSource::seed_from(9);
        let mut rng2 = RandomSource::seed_from(9);
        let mut p1 = rule.initialize(200, &mut rng1).unwrap();
        let mut p2 = unbiased.initialize(200, &mut rng2).unwrap();
        for _ in 0..25 {
            p1 = rule.next_generation(&p1, &mut rng1).unwrap();
            p2 = unbiased.next_generation(&p2, &mut rng2).unwrap();
            assert_eq!(p1.traits(), p2.traits());
        }
    }

    #[test]
    fn without_b_copying_a_never_declines() {
        let rule = DirectBias::new(&DirectBiasParameters {
            p_0: 0.05,
            s_a: 0.2,
            s_b: 0.0,
        })
        .unwrap();
        let mut rng = RandomSource::seed_from(10);
        let mut population = rule.initialize(300, &mut rng).unwrap();
        for _ in 0..40 {
            let before = population.count(A);
            population = rule.next_generation(&population, &mut rng).unwrap();
            assert!(population.count(A) >= before);
        }
    }
}
