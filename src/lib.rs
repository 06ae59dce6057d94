/*!
Model Description
=================

This model description follows the ODD (Overview, Design concept, Details)
protocol (Grimm et al., 2006; Grimm et al., 2010). As far as it is useful in
Rust source code, the description is kept next to the code that implements
it: the crate documentation gives the overview, and each submodel documents
itself.

# 1. Purpose

The transmission models are a collection of small individual-based models of
cultural evolution. Each one isolates a single process (unbiased copying,
mutation, content bias, conformity, prestige bias, vertical and horizontal
transmission, innovation, the evolution of learning strategies, demography,
and population structure) so that its consequences for the distribution of
cultural traits can be studied on its own, by running many replicates and
sweeping over parameter values.

 */

use serde_derive::Serialize;
use tracing::debug;

pub mod error;
pub mod probability;
pub mod random;

mod debug;

use error::{Result, SimulationError};
use observation::{Aggregator, Record, Summary};
use population::{Fallbacks, Population};
use random::RandomSource;
use submodels::UpdateRule;

/**
# 2. Entities, state variables, and scales

The only entities are agents, and all agents of one generation together form
a [`Population`](population::Population) of fixed size N. Every agent carries
a discrete cultural trait. Depending on the model it also carries a
continuous attribute, a status, a cluster, a fitness or skill, or a learning
strategy.

Time is discrete. One time step is one generation, and generations are
numbered from 1, the initial state.
 */
pub type Generation = u32;

pub mod population;

/**
# 3. Process overview and scheduling

Generations do not overlap. Each time step, the whole next generation is
constructed from the previous one by the model's
[`UpdateRule`](submodels::UpdateRule), reading only the previous generation,
and then the new generation replaces the old one. After initialization and
after every step, the generation is summarized by an
[`Aggregator`](observation::Aggregator).

A run is one such sequence of `max_t` generations. Many runs with the same
parameters (replicates), and many parameter combinations, make up an
[`Experiment`](experiment::Experiment).

# 4. Design concepts

## 4.1 Stochasticity

Every random decision goes through the run's own
[`RandomSource`](random::RandomSource), so a run is a pure function of its
parameters and its seed.

## 4.2 Observation
 */
pub mod observation;

/**
# 5. Initialization

Each model builds its own first generation of N agents with
[`UpdateRule::initialize`](submodels::UpdateRule::initialize). Binary models
draw trait A with probability `p_0` per agent.

# 6. Input data

The models use no input data. The parameters of each model are plain records
that can be read from JSON.
 */
pub mod parameters;

pub mod submodels;

pub mod experiment;

pub mod cli;
pub mod util;

/// An update rule together with the aggregator that summarizes its output.
pub struct Model {
    pub rule: Box<dyn UpdateRule>,
    pub aggregator: Box<dyn Aggregator>,
}

impl Model {
    pub fn new<R: UpdateRule + 'static>(rule: R, aggregator: Box<dyn Aggregator>) -> Self {
        Model {
            rule: Box::new(rule),
            aggregator,
        }
    }

    /// Initialize a population of `n` agents and run it for `max_t`
    /// generations.
    pub fn simulate(
        &self,
        n: usize,
        max_t: Generation,
        rng: &mut RandomSource,
    ) -> Result<Trajectory> {
        if n < 1 {
            return Err(SimulationError::configuration("population size must be at least 1"));
        }
        let initial = self.rule.initialize(n, rng)?;
        run(initial, self.rule.as_ref(), max_t, self.aggregator.as_ref(), rng)
    }
}

/// The summaries of one run, one per generation, starting with the initial
/// state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trajectory {
    pub summaries: Vec<Summary>,
    /// The fallbacks taken over the whole run.
    pub fallbacks: Fallbacks,
}

impl Trajectory {
    pub fn records(&self, cell: usize, replicate: usize) -> Vec<Record> {
        self.summaries
            .iter()
            .zip(1..)
            .flat_map(|(summary, generation)| {
                summary
                    .rows()
                    .into_iter()
                    .map(move |(category, value)| Record {
                        cell,
                        replicate,
                        generation,
                        category,
                        value,
                    })
            })
            .collect()
    }
}

/**
Run `rule` from `initial` for `max_t` generations, the first of which is
`initial` itself, and summarize every generation with `aggregator`.

Any error of the rule ends the run. A rule that changed the number of agents
is an error as well.
 */
pub fn run(
    initial: Population,
    rule: &dyn UpdateRule,
    max_t: Generation,
    aggregator: &dyn Aggregator,
    rng: &mut RandomSource,
) -> Result<Trajectory> {
    if max_t < 1 {
        return Err(SimulationError::configuration("a run needs at least one generation"));
    }
    if initial.is_empty() {
        return Err(SimulationError::configuration("population size must be at least 1"));
    }
    let n = initial.len();
    debug!(rule = rule.name(), n, max_t, "starting run");

    let mut summaries = Vec::with_capacity(max_t as usize);
    summaries.push(aggregator.summarize(&initial));
    let mut population = initial;
    for t in 2..=max_t {
        let next = rule.next_generation(&population, rng)?;
        if next.len() != n {
            return Err(SimulationError::PopulationSizeChanged {
                expected: n,
                found: next.len(),
            });
        }
        summaries.push(aggregator.summarize(&next));
        population = next;
        if t % 1000 == 0 {
            debug!(rule = rule.name(), t, "still running");
        }
    }

    let fallbacks = population.fallbacks();
    debug!(rule = rule.name(), ?fallbacks, "run ended");
    Ok(Trajectory {
        summaries,
        fallbacks,
    })
}
