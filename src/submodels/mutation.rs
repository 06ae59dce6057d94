use crate::error::Result;
use crate::parameters::MutationParameters;
use crate::population::{Population, A, B};
use crate::probability::Probability;
use crate::random::RandomSource;
use crate::submodels::UpdateRule;

/**
Mutation without copying. Each agent keeps its own trait from the previous
generation, except that an A switches to B with probability `mu_a` and a B
switches to A with probability `mu_b`. With `mu_a == mu_b` the mutation is
unbiased and the frequency of A relaxes towards one half; with a single
positive rate the favoured trait goes to fixation.
 */
#[derive(Debug, Clone)]
pub struct BiasedMutation {
    pub p_0: Probability,
    pub mu_a: Probability,
    pub mu_b: Probability,
}

impl BiasedMutation {
    pub fn new(p: &MutationParameters) -> Result<Self> {
        Ok(BiasedMutation {
            p_0: Probability::new("p_0", p.p_0)?,
            mu_a: Probability::new("mu_a", p.mu_a)?,
            mu_b: Probability::new("mu_b", p.mu_b)?,
        })
    }
}

impl UpdateRule for BiasedMutation {
    fn name(&self) -> &'static str {
        "biased_mutation"
    }

    fn initialize(&self, n: usize, rng: &mut RandomSource) -> Result<Population> {
        Population::with_initial_frequency(n, self.p_0, rng)
    }

    fn next_generation(&self, previous: &Population, rng: &mut RandomSource) -> Result<Population> {
        let mut next = previous.clone();
        for (new, &old) in next.traits_mut().iter_mut().zip(previous.traits()) {
            *new = if old == A {
                if rng.bernoulli(self.mu_a) {
                    B
                } else {
                    A
                }
            } else if rng.bernoulli(self.mu_b) {
                A
            } else {
                B
            };
        }
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_sided_mutation_only_moves_one_way() {
        let rule = BiasedMutation::new(&MutationParameters {
            p_0: 0.5,
            mu_a: 0.0,
            mu_b: 0.2,
        })
        .unwrap();
        let mut rng = RandomSource::seed_from(5);
        let mut population = rule.initialize(500, &mut rng).unwrap();
        let mut a = population.count(A);
        for _ in 0..30 {
            population = rule.next_generation(&population, &mut rng).unwrap();
            assert!(population.count(A) >= a);
            a = population.count(A);
        }
        assert!(population.frequency(A) > 0.99);
    }
}
