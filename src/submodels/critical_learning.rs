use serde_derive::{Deserialize, Serialize};

use crate::error::{Result, SimulationError};
use crate::parameters::CriticalLearningParameters;
use crate::population::{LearningStrategy, Population, Trait};
use crate::probability::Probability;
use crate::random::RandomSource;
use crate::submodels::UpdateRule;

/**
How the success of individual learning is drawn within one generation.

With `Shared`, one success draw is made per agent at the start of the
learning phase and used both by individual learners and by critical
learners falling back to individual learning. With `Independent`, critical
learners draw afresh when they fall back. Since an agent has exactly one
strategy the two only differ in how many random numbers are consumed; they
agree in distribution.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningDraws {
    Shared,
    Independent,
}

impl Default for LearningDraws {
    fn default() -> Self {
        LearningDraws::Shared
    }
}

/**
The evolution of learning strategies in a changing environment (Rogers'
paradox, with critical learners).

Agents carry a learning strategy, a behaviour (the trait column) and a
fitness. The environment is a label that starts at 1 and increases by one
with probability `u` per generation; a behaviour is correct if it equals the
current environment. One generation is:

1. Reproduction: each new agent inherits the strategy of the previous
   generation with probability proportional to the strategies' shares of
   total fitness. Individual and social learners get their shares; critical
   learners the remainder.
2. Mutation: with probability `mu` an agent switches to one of the two other
   strategies, chosen uniformly.
3. Environmental change.
4. Learning. Individual learners pay `b·c` and find the correct behaviour
   with probability `p`. Social learners pay `b·s` and copy the behaviour of
   a random member of the previous generation. Critical learners learn
   socially first and only if that behaviour is wrong pay `b·c` to learn
   individually.
5. Payoff: fitness starts at `w` and gains `b` for a correct behaviour, or
   loses `b` for a wrong one.

The constructor requires `b·(1 + c + s) < w`, so that fitness stays
positive and the reproduction weights are always well defined.
 */
#[derive(Debug, Clone)]
pub struct CriticalLearning {
    pub w: f64,
    pub b: f64,
    pub c: f64,
    pub s: f64,
    pub p: Probability,
    pub mu: Probability,
    pub u: Probability,
    pub draws: LearningDraws,
}

impl CriticalLearning {
    pub fn new(p: &CriticalLearningParameters) -> Result<Self> {
        for (name, value) in [("w", p.w), ("b", p.b), ("c", p.c), ("s", p.s)] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(SimulationError::configuration(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        if p.b * (1.0 + p.c + p.s) >= p.w {
            return Err(SimulationError::configuration(format!(
                "b·(1 + c + s) = {} must be below the baseline fitness w = {}",
                p.b * (1.0 + p.c + p.s),
                p.w
            )));
        }
        Ok(CriticalLearning {
            w: p.w,
            b: p.b,
            c: p.c,
            s: p.s,
            p: Probability::new("p", p.p)?,
            mu: Probability::new("mu", p.mu)?,
            u: Probability::new("u", p.u)?,
            draws: p.draws,
        })
    }

    /// Shares of total fitness held by individual and social learners, and
    /// the remainder left to critical learners.
    pub fn fitness_shares(&self, previous: &Population) -> [f64; 3] {
        let mut individual = 0.0;
        let mut social = 0.0;
        let mut total = 0.0;
        for (strategy, &fitness) in previous.strategies().iter().zip(previous.fitness()) {
            match strategy {
                LearningStrategy::Individual => individual += fitness,
                LearningStrategy::Social => social += fitness,
                LearningStrategy::Critical => {}
            }
            total += fitness;
        }
        let individual = individual / total;
        let social = social / total;
        [individual, social, (1.0 - (individual + social)).max(0.0)]
    }

    fn learn_individually(&self, environment: Trait, success: bool) -> Trait {
        if success {
            environment
        } else {
            environment - 1
        }
    }
}

impl UpdateRule for CriticalLearning {
    fn name(&self) -> &'static str {
        "critical_learner"
    }

    fn initialize(&self, n: usize, rng: &mut RandomSource) -> Result<Population> {
        let mut strategies = Vec::with_capacity(n);
        for _ in 0..n {
            strategies.push(LearningStrategy::ALL[rng.below(3)?]);
        }
        let environment = 1;
        Population::uniform(n, environment - 1)?
            .with_strategies(strategies)?
            .with_fitness(vec![self.w; n])
            .map(|population| population.with_environment(environment))
    }

    fn next_generation(&self, previous: &Population, rng: &mut RandomSource) -> Result<Population> {
        let n = previous.len();
        let mut next = previous.clone();

        let shares = self.fitness_shares(previous);
        for (strategy, i) in next
            .strategies_mut()
            .iter_mut()
            .zip(rng.weighted_sample(&shares, n)?)
        {
            *strategy = LearningStrategy::ALL[i];
        }
        for strategy in next.strategies_mut().iter_mut() {
            if rng.bernoulli(self.mu) {
                *strategy = strategy.others()[rng.below(2)?];
            }
        }

        let mut environment = previous.environment();
        if rng.bernoulli(self.u) {
            environment += 1;
        }
        next.set_environment(environment);

        let learn_correct = rng.bernoulli_mask(n, self.p);
        let mut behaviours = Vec::with_capacity(n);
        let mut fitness = Vec::with_capacity(n);
        for (i, strategy) in next.strategies().iter().enumerate() {
            let mut payoff = self.w;
            let behaviour = match strategy {
                LearningStrategy::Individual => {
                    payoff -= self.b * self.c;
                    self.learn_individually(environment, learn_correct[i])
                }
                LearningStrategy::Social => {
                    payoff -= self.b * self.s;
                    previous.traits()[rng.below(n)?]
                }
                LearningStrategy::Critical => {
                    payoff -= self.b * self.s;
                    let copied = previous.traits()[rng.below(n)?];
                    if copied == environment {
                        copied
                    } else {
                        payoff -= self.b * self.c;
                        let success = match self.draws {
                            LearningDraws::Shared => learn_correct[i],
                            LearningDraws::Independent => rng.bernoulli(self.p),
                        };
                        self.learn_individually(environment, success)
                    }
                }
            };
            if behaviour == environment {
                payoff += self.b;
            } else {
                payoff -= self.b;
            }
            behaviours.push(behaviour);
            fitness.push(payoff);
        }
        next.traits_mut().copy_from_slice(&behaviours);
        next.fitness_mut().copy_from_slice(&fitness);
        Ok(next)
    }
}
