use crate::error::{Result, SimulationError};
use crate::parameters::DemographyParameters;
use crate::population::{Population, A};
use crate::random::RandomSource;
use crate::submodels::UpdateRule;

/**
Demography and the accumulation of a complex skill.

Every agent carries a skill level (the fitness column), which starts at 0.
Each generation every agent learns from the most skilled member of the
previous generation, and learning is lossy: the new skill is a Gumbel draw
with location `max(z) - alpha` and scale `beta`. Large populations are more
likely to produce one lucky learner who exceeds the model, so mean skill
rises above a critical population size and decays below it.
 */
#[derive(Debug, Clone)]
pub struct DemographySkill {
    pub alpha: f64,
    pub beta: f64,
}

impl DemographySkill {
    pub fn new(p: &DemographyParameters) -> Result<Self> {
        if !p.alpha.is_finite() {
            return Err(SimulationError::configuration(format!(
                "alpha must be finite, got {}",
                p.alpha
            )));
        }
        if !(p.beta.is_finite() && p.beta > 0.0) {
            return Err(SimulationError::configuration(format!(
                "beta must be positive, got {}",
                p.beta
            )));
        }
        Ok(DemographySkill {
            alpha: p.alpha,
            beta: p.beta,
        })
    }
}

impl UpdateRule for DemographySkill {
    fn name(&self) -> &'static str {
        "demography_skill"
    }

    fn initialize(&self, n: usize, _rng: &mut RandomSource) -> Result<Population> {
        Population::uniform(n, A)?.with_fitness(vec![0.0; n])
    }

    fn next_generation(&self, previous: &Population, rng: &mut RandomSource) -> Result<Population> {
        let best = previous
            .fitness()
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        let skills = rng.gumbel_vec(previous.len(), best - self.alpha, self.beta)?;
        let mut next = previous.clone();
        next.fitness_mut().copy_from_slice(&skills);
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_must_be_positive() {
        assert!(DemographySkill::new(&DemographyParameters { alpha: 7.0, beta: 0.0 }).is_err());
        assert!(DemographySkill::new(&DemographyParameters {
            alpha: f64::NAN,
            beta: 1.0
        })
        .is_err());
    }

    #[test]
    fn a_single_learner_loses_alpha_minus_euler_gamma_beta_on_average() {
        let rule = DemographySkill::new(&DemographyParameters { alpha: 2.0, beta: 1.0 }).unwrap();
        let mut rng = RandomSource::seed_from(61);
        let mut total = 0.0;
        let trials = 20_000;
        for _ in 0..trials {
            let start = rule.initialize(1, &mut rng).unwrap();
            let next = rule.next_generation(&start, &mut rng).unwrap();
            total += next.fitness()[0];
        }
        let mean = total / trials as f64;
        assert!((mean - (-2.0 + 0.5772)).abs() < 0.05);
    }
}
