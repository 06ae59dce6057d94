use crate::error::Result;
use crate::parameters::OpennessParameters;
use crate::population::{Population, A};
use crate::probability::Probability;
use crate::random::RandomSource;
use crate::submodels::UpdateRule;

/**
Openness and conservatism. Each agent carries a continuous trait P in
[0, 1], which is both what is transmitted and how willing the agent is to
copy. An agent meets one random demonstrator of the previous generation and
adopts the demonstrator's P with probability equal to its own previous P.

Closed agents rarely change while open agents keep adopting, so without
mutation the population mean drifts down towards the most conservative
values. With `mu > 0` an agent's P is re-drawn uniformly with probability
`mu` after copying.
 */
#[derive(Debug, Clone)]
pub struct OpennessConservatism {
    pub mu: Probability,
}

impl OpennessConservatism {
    pub fn new(p: &OpennessParameters) -> Result<Self> {
        Ok(OpennessConservatism {
            mu: Probability::new("mu", p.mu)?,
        })
    }
}

impl UpdateRule for OpennessConservatism {
    fn name(&self) -> &'static str {
        "openness_conservatism"
    }

    fn initialize(&self, n: usize, rng: &mut RandomSource) -> Result<Population> {
        Population::uniform(n, A)?.with_uniform_attributes(rng)
    }

    fn next_generation(&self, previous: &Population, rng: &mut RandomSource) -> Result<Population> {
        let n = previous.len();
        let demonstrators = rng.sample_with_replacement(n, n)?;
        let mut next = previous.clone();
        for ((new, &own), d) in next
            .attributes_mut()
            .iter_mut()
            .zip(previous.attributes())
            .zip(demonstrators)
        {
            if rng.uniform() < own {
                *new = previous.attributes()[d];
            }
            if rng.bernoulli(self.mu) {
                *new = rng.uniform();
            }
        }
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fully_closed_agents_never_change() {
        let rule = OpennessConservatism::new(&OpennessParameters { mu: 0.0 }).unwrap();
        let mut rng = RandomSource::seed_from(41);
        let previous = Population::uniform(4, A)
            .unwrap()
            .with_attributes(vec![0.0, 0.0, 1.0, 0.0])
            .unwrap();
        let next = rule.next_generation(&previous, &mut rng).unwrap();
        assert_eq!(next.attributes()[0], 0.0);
        assert_eq!(next.attributes()[1], 0.0);
        assert_eq!(next.attributes()[3], 0.0);
    }

    #[test]
    fn without_mutation_only_initial_values_circulate() {
        let rule = OpennessConservatism::new(&OpennessParameters { mu: 0.0 }).unwrap();
        let mut rng = RandomSource::seed_from(42);
        let start = rule.initialize(100, &mut rng).unwrap();
        let mut population = start.clone();
        for _ in 0..30 {
            population = rule.next_generation(&population, &mut rng).unwrap();
        }
        for p in population.attributes() {
            assert!(start.attributes().contains(p));
        }
    }
}
