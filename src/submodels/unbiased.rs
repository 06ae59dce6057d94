use crate::error::Result;
use crate::parameters::UnbiasedParameters;
use crate::population::Population;
use crate::probability::Probability;
use crate::random::RandomSource;
use crate::submodels::{copied_traits, UpdateRule};

/**
Unbiased transmission. Every new agent picks one member of the previous
generation at random and copies its trait. Nothing but drift changes the
frequencies; in a finite population one trait eventually takes over.
 */
#[derive(Debug, Clone)]
pub struct UnbiasedCopy {
    pub p_0: Probability,
}

impl UnbiasedCopy {
    pub fn new(p: &UnbiasedParameters) -> Result<Self> {
        Ok(UnbiasedCopy {
            p_0: Probability::new("p_0", p.p_0)?,
        })
    }
}

impl UpdateRule for UnbiasedCopy {
    fn name(&self) -> &'static str {
        "unbiased_copy"
    }

    fn initialize(&self, n: usize, rng: &mut RandomSource) -> Result<Population> {
        Population::with_initial_frequency(n, self.p_0, rng)
    }

    fn next_generation(&self, previous: &Population, rng: &mut RandomSource) -> Result<Population> {
        let mut next = previous.clone();
        let traits = copied_traits(previous, rng)?;
        next.traits_mut().copy_from_slice(&traits);
        Ok(next)
    }
}
