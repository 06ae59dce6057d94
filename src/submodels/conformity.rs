use crate::error::Result;
use crate::parameters::ConformityParameters;
use crate::population::{Population, A, B};
use crate::probability::Probability;
use crate::random::RandomSource;
use crate::submodels::UpdateRule;

/// Number of demonstrators each agent observes.
pub const DEMONSTRATORS: usize = 3;

/**
Conformist bias. Each agent observes three random demonstrators of the
previous generation. A unanimous triple is copied outright. Otherwise A is
adopted with probability `2/3 + D/3` when two demonstrators show A, and with
probability `1/3 - D/3` when only one does.

`D = 0` gives the same odds as copying one of the three at random; `D = 1`
always follows the strict majority.
 */
#[derive(Debug, Clone)]
pub struct ConformistBias {
    pub p_0: Probability,
    pub d: Probability,
    majority: Probability,
    minority: Probability,
}

impl ConformistBias {
    pub fn new(p: &ConformityParameters) -> Result<Self> {
        let d = Probability::new("D", p.d)?;
        Ok(ConformistBias {
            p_0: Probability::new("p_0", p.p_0)?,
            d,
            majority: Probability::new("majority adoption", (2. + d.value()) / 3.)?,
            minority: Probability::new("minority adoption", (1. - d.value()) / 3.)?,
        })
    }

    /// The probability of adopting A when `count` of the three demonstrators
    /// show A.
    pub fn adoption_probability(&self, count: usize) -> Probability {
        match count {
            0 => Probability::ZERO,
            1 => self.minority,
            2 => self.majority,
            _ => Probability::ONE,
        }
    }
}

impl UpdateRule for ConformistBias {
    fn name(&self) -> &'static str {
        "conformist_bias"
    }

    fn initialize(&self, n: usize, rng: &mut RandomSource) -> Result<Population> {
        Population::with_initial_frequency(n, self.p_0, rng)
    }

    fn next_generation(&self, previous: &Population, rng: &mut RandomSource) -> Result<Population> {
        let n = previous.len();
        let mut next = previous.clone();
        for new in next.traits_mut().iter_mut() {
            let count = rng
                .sample_with_replacement(n, DEMONSTRATORS)?
                .into_iter()
                .filter(|&d| previous.traits()[d] == A)
                .count();
            *new = match count {
                0 => B,
                DEMONSTRATORS => A,
                _ => {
                    if rng.bernoulli(self.adoption_probability(count)) {
                        A
                    } else {
                        B
                    }
                }
            };
        }
        Ok(next)
    }
}
