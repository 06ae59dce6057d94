use crate::error::Result;
use crate::parameters::{VerticalHorizontalParameters, VerticalParameters};
use crate::population::{Mask, Population, A, B};
use crate::probability::Probability;
use crate::random::RandomSource;
use crate::submodels::UpdateRule;

/**
Vertical transmission. Each new agent has two parents drawn independently
from the previous generation. Two A parents give an A, two B parents a B, and
mixed parents an A with probability `b`.
 */
#[derive(Debug, Clone)]
pub struct VerticalTransmission {
    pub p_0: Probability,
    pub b: Probability,
}

impl VerticalTransmission {
    pub fn new(p: &VerticalParameters) -> Result<Self> {
        Ok(VerticalTransmission {
            p_0: Probability::new("p_0", p.p_0)?,
            b: Probability::new("b", p.b)?,
        })
    }
}

impl UpdateRule for VerticalTransmission {
    fn name(&self) -> &'static str {
        "vertical_transmission"
    }

    fn initialize(&self, n: usize, rng: &mut RandomSource) -> Result<Population> {
        Population::with_initial_frequency(n, self.p_0, rng)
    }

    fn next_generation(&self, previous: &Population, rng: &mut RandomSource) -> Result<Population> {
        let n = previous.len();
        let mut next = previous.clone();
        for new in next.traits_mut().iter_mut() {
            let mother = previous.traits()[rng.below(n)?];
            let father = previous.traits()[rng.below(n)?];
            *new = match (mother == A, father == A) {
                (true, true) => A,
                (false, false) => B,
                _ => {
                    if rng.bernoulli(self.b) {
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

/**
Vertical followed by horizontal transmission. After the vertical step, every
agent that ended up with B meets `n` random members of the post-vertical
generation. Each of those showing A converts the agent to A independently
with probability `g`; one success is enough.
 */
#[derive(Debug, Clone)]
pub struct VerticalHorizontal {
    pub vertical: VerticalTransmission,
    pub n: usize,
    pub g: Probability,
}

impl VerticalHorizontal {
    pub fn new(p: &VerticalHorizontalParameters) -> Result<Self> {
        Ok(VerticalHorizontal {
            vertical: VerticalTransmission::new(&VerticalParameters { p_0: p.p_0, b: p.b })?,
            n: p.n,
            g: Probability::new("g", p.g)?,
        })
    }
}

impl UpdateRule for VerticalHorizontal {
    fn name(&self) -> &'static str {
        "vertical_horizontal"
    }

    fn initialize(&self, n: usize, rng: &mut RandomSource) -> Result<Population> {
        self.vertical.initialize(n, rng)
    }

    fn next_generation(&self, previous: &Population, rng: &mut RandomSource) -> Result<Population> {
        let mut next = self.vertical.next_generation(previous, rng)?;
        if self.n == 0 {
            return Ok(next);
        }
        let after_vertical = next.snapshot();
        let size = after_vertical.len();
        let bs = after_vertical.select(|agent| agent.label != A);
        let mut converted = Mask::repeat(false, size);
        for i in bs.iter_ones() {
            for d in rng.sample_with_replacement(size, self.n)? {
                if after_vertical.traits()[d] == A && rng.bernoulli(self.g) {
                    converted.set(i, true);
                }
            }
        }
        next.assign_traits(&converted, A)?;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pure_parents_breed_true() {
        let rule = VerticalTransmission::new(&VerticalParameters { p_0: 0.5, b: 0.5 }).unwrap();
        let mut rng = RandomSource::seed_from(8);
        let all_b = Population::uniform(40, B).unwrap();
        let next = rule.next_generation(&all_b, &mut rng).unwrap();
        assert_eq!(next.count(B), 40);
    }

    #[test]
    fn horizontal_step_only_converts_towards_a() {
        let rule = VerticalHorizontal::new(&VerticalHorizontalParameters {
            p_0: 0.5,
            b: 0.5,
            n: 3,
            g: 0.0,
        })
        .unwrap();
        let vertical = rule.vertical.clone();
        let mut rng1 = RandomSource::seed_from(6);
        let mut rng2 = RandomSource::seed_from(6);
        let start = rule.initialize(300, &mut rng1).unwrap();
        vertical.initialize(300, &mut rng2).unwrap();
        let with_horizontal = rule.next_generation(&start, &mut rng1).unwrap();
        let without = vertical.next_generation(&start, &mut rng2).unwrap();
        assert_eq!(with_horizontal.traits(), without.traits());
    }

    #[test]
    fn certain_horizontal_learning_spreads_a() {
        let rule = VerticalHorizontal::new(&VerticalHorizontalParameters {
            p_0: 0.5,
            b: 0.5,
            n: 5,
            g: 1.0,
        })
        .unwrap();
        let mut rng = RandomSource::seed_from(7);
        let start = rule.initialize(1000, &mut rng).unwrap();
        let next = rule.next_generation(&start, &mut rng).unwrap();
        assert!(next.frequency(A) > 0.85);
    }
}
