use tracing::debug;

use crate::error::{Result, SimulationError};
use crate::parameters::DemonstratorParameters;
use crate::population::Population;
use crate::probability::Probability;
use crate::random::RandomSource;
use crate::submodels::UpdateRule;

/**
Demonstrator (prestige) bias. At initialization each agent is given high
status with probability `p_s`; status does not change during a run.
Demonstrators are then sampled with weight 1 if high-status and `p_low` if
low-status.

If every weight is zero (no high-status agents and `p_low = 0`) there is
nobody to learn from. This rule then keeps the previous generation's traits
unchanged and counts the skipped transition in the population's
[`Fallbacks`](crate::population::Fallbacks); it is not an error.
 */
#[derive(Debug, Clone)]
pub struct DemonstratorBias {
    pub p_0: Probability,
    pub p_s: Probability,
    pub p_low: Probability,
}

impl DemonstratorBias {
    pub fn new(p: &DemonstratorParameters) -> Result<Self> {
        Ok(DemonstratorBias {
            p_0: Probability::new("p_0", p.p_0)?,
            p_s: Probability::new("p_s", p.p_s)?,
            p_low: Probability::new("p_low", p.p_low)?,
        })
    }
}

impl UpdateRule for DemonstratorBias {
    fn name(&self) -> &'static str {
        "demonstrator_bias"
    }

    fn initialize(&self, n: usize, rng: &mut RandomSource) -> Result<Population> {
        let population = Population::with_initial_frequency(n, self.p_0, rng)?;
        let status = rng.bernoulli_mask(n, self.p_s);
        population.with_status(status)
    }

    fn next_generation(&self, previous: &Population, rng: &mut RandomSource) -> Result<Population> {
        let n = previous.len();
        let weights: Vec<f64> = previous
            .status()
            .iter()
            .map(|high| if *high { 1.0 } else { self.p_low.value() })
            .collect();
        let mut next = previous.clone();
        match rng.weighted_sample(&weights, n) {
            Ok(demonstrators) => {
                for (new, d) in next.traits_mut().iter_mut().zip(demonstrators) {
                    *new = previous.traits()[d];
                }
            }
            Err(SimulationError::DegenerateDistribution) => {
                debug!(n, "no demonstrator has positive weight, keeping previous traits");
                next.fallbacks_mut().skipped_transitions += 1;
            }
            Err(e) => return Err(e),
        }
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::population::{Mask, A, B};

    #[test]
    fn only_high_status_agents_are_copied_when_p_low_is_zero() {
        let rule = DemonstratorBias::new(&DemonstratorParameters {
            p_0: 0.5,
            p_s: 0.5,
            p_low: 0.0,
        })
        .unwrap();
        let status: Mask = [true, false, false, false].iter().copied().collect();
        let previous = Population::new(vec![A, B, B, B])
            .unwrap()
            .with_status(status)
            .unwrap();
        let mut rng = RandomSource::seed_from(3);
        let next = rule.next_generation(&previous, &mut rng).unwrap();
        assert_eq!(next.traits(), &[A, A, A, A]);
        assert_eq!(next.status(), previous.status());
    }

    #[test]
    fn no_valid_demonstrator_skips_the_copy_step() {
        let rule = DemonstratorBias::new(&DemonstratorParameters {
            p_0: 0.5,
            p_s: 0.0,
            p_low: 0.0,
        })
        .unwrap();
        let mut rng = RandomSource::seed_from(4);
        let previous = rule.initialize(10, &mut rng).unwrap();
        let next = rule.next_generation(&previous, &mut rng).unwrap();
        assert_eq!(next.traits(), previous.traits());
        assert_eq!(next.fallbacks().skipped_transitions, 1);
    }
}
