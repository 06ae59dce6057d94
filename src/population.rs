/*!
The population: a fixed number of agents stored column-wise.

The trait column is always present. The other agent fields (continuous
attribute, status flag, cluster membership, fitness or skill, learning
strategy) are columns that are either empty, when the model does not use
them, or exactly as long as the trait column. Columns are only handed out as
slices, so no code outside this module can change the number of agents.
 */

use std::ops::{Deref, RangeInclusive};

use bitvec::vec::BitVec;
use serde_derive::{Deserialize, Serialize};

use crate::error::{Result, SimulationError};
use crate::probability::Probability;
use crate::random::RandomSource;

/// A discrete cultural trait. Labels start at 1; binary models use [`A`] and
/// [`B`], open-ended models issue fresh labels from a [`LabelArena`].
pub type Trait = u32;
pub const A: Trait = 1;
pub const B: Trait = 2;

/// Clusters are numbered `1..=C`.
pub type ClusterId = u16;

/// A boolean selection over the agents of a population.
pub type Mask = BitVec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LearningStrategy {
    Individual,
    Social,
    Critical,
}

impl LearningStrategy {
    pub const ALL: [LearningStrategy; 3] = [
        LearningStrategy::Individual,
        LearningStrategy::Social,
        LearningStrategy::Critical,
    ];

    pub fn others(self) -> [LearningStrategy; 2] {
        match self {
            LearningStrategy::Individual => [LearningStrategy::Social, LearningStrategy::Critical],
            LearningStrategy::Social => [LearningStrategy::Individual, LearningStrategy::Critical],
            LearningStrategy::Critical => [LearningStrategy::Individual, LearningStrategy::Social],
        }
    }
}

/**
Trait labels for models with innovation. New labels are handed out from a
monotonic counter that lives for the whole run, so a label is never reused,
even after every agent carrying it has switched to something else.

```rust
use model::population::LabelArena;
let mut labels = LabelArena::starting_after(3);
assert_eq!(labels.issue(2, None), Some(4..=5));
assert_eq!(labels.issue(1, Some(5)), None);
assert_eq!(labels.highest(), 5);
```
 */
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LabelArena {
    issued: Trait,
}

impl LabelArena {
    pub fn starting_after(highest: Trait) -> Self {
        LabelArena { issued: highest }
    }

    pub fn highest(&self) -> Trait {
        self.issued
    }

    /// Issue `count` fresh labels, unless that would take the highest label
    /// past `capacity` (or past `Trait::MAX`). Nothing is issued on refusal.
    /// Asking for zero labels yields an empty range.
    pub fn issue(
        &mut self,
        count: usize,
        capacity: Option<Trait>,
    ) -> Option<RangeInclusive<Trait>> {
        if count == 0 {
            return Some(RangeInclusive::new(1, 0));
        }
        let count = Trait::try_from(count).ok()?;
        let last = self.issued.checked_add(count)?;
        if let Some(capacity) = capacity {
            if last > capacity {
                return None;
            }
        }
        let fresh = (self.issued + 1)..=last;
        self.issued = last;
        Some(fresh)
    }
}

/// Deliberate no-op fallbacks taken during a run. Rules that guard a sampling
/// edge case count it here instead of silently substituting a value.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Fallbacks {
    /// Transitions skipped because no demonstrator had positive weight.
    pub skipped_transitions: u32,
    /// Generations whose innovations were dropped at label capacity.
    pub suppressed_innovations: u32,
}

impl Fallbacks {
    pub fn any(&self) -> bool {
        self.skipped_transitions > 0 || self.suppressed_innovations > 0
    }
}

/// A read-only view of one agent's fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Agent {
    pub label: Trait,
    pub attribute: Option<f64>,
    pub high_status: Option<bool>,
    pub cluster: Option<ClusterId>,
    pub fitness: Option<f64>,
    pub strategy: Option<LearningStrategy>,
}

#[derive(Clone, PartialEq)]
pub struct Population {
    pub(crate) traits: Vec<Trait>,
    pub(crate) attributes: Vec<f64>,
    pub(crate) status: Mask,
    pub(crate) clusters: Vec<ClusterId>,
    pub(crate) fitness: Vec<f64>,
    pub(crate) strategies: Vec<LearningStrategy>,
    pub(crate) labels: LabelArena,
    pub(crate) environment: Trait,
    pub(crate) fallbacks: Fallbacks,
}

impl Population {
    pub fn new(traits: Vec<Trait>) -> Result<Self> {
        if traits.is_empty() {
            return Err(SimulationError::configuration("a population needs at least one agent"));
        }
        let highest = traits.iter().copied().max().unwrap_or(0);
        Ok(Population {
            traits,
            attributes: vec![],
            status: Mask::new(),
            clusters: vec![],
            fitness: vec![],
            strategies: vec![],
            labels: LabelArena::starting_after(highest),
            environment: 0,
            fallbacks: Fallbacks::default(),
        })
    }

    /// `n` agents, all carrying the same trait.
    pub fn uniform(n: usize, label: Trait) -> Result<Self> {
        Population::new(vec![label; n])
    }

    /// `n` agents, each independently carrying [`A`] with probability `p_0`
    /// and [`B`] otherwise.
    pub fn with_initial_frequency(
        n: usize,
        p_0: Probability,
        rng: &mut RandomSource,
    ) -> Result<Self> {
        let traits = (0..n).map(|_| if rng.bernoulli(p_0) { A } else { B }).collect();
        let mut population = Population::new(traits)?;
        population.labels = LabelArena::starting_after(B);
        Ok(population)
    }

    /// `n` agents with traits drawn uniformly from `1..=m`.
    pub fn with_uniform_traits(n: usize, m: Trait, rng: &mut RandomSource) -> Result<Self> {
        if m < 1 {
            return Err(SimulationError::configuration("need at least one initial trait"));
        }
        let mut traits = Vec::with_capacity(n);
        for _ in 0..n {
            traits.push(rng.below(m as usize)? as Trait + 1);
        }
        let mut population = Population::new(traits)?;
        population.labels = LabelArena::starting_after(m);
        Ok(population)
    }

    /// `n` agents with traits drawn from `1..=weights.len()` proportional to
    /// `weights`.
    pub fn with_weighted_traits(n: usize, weights: &[f64], rng: &mut RandomSource) -> Result<Self> {
        let traits = rng
            .weighted_sample(weights, n)?
            .into_iter()
            .map(|i| i as Trait + 1)
            .collect();
        let mut population = Population::new(traits)?;
        population.labels = LabelArena::starting_after(weights.len() as Trait);
        Ok(population)
    }

    pub fn with_attributes(mut self, attributes: Vec<f64>) -> Result<Self> {
        self.check_column("attribute", attributes.len())?;
        self.attributes = attributes;
        Ok(self)
    }

    /// Continuous attributes drawn from Uniform[0, 1).
    pub fn with_uniform_attributes(self, rng: &mut RandomSource) -> Result<Self> {
        let attributes = (0..self.len()).map(|_| rng.uniform()).collect();
        self.with_attributes(attributes)
    }

    pub fn with_status(mut self, status: Mask) -> Result<Self> {
        self.check_column("status", status.len())?;
        self.status = status;
        Ok(self)
    }

    pub fn with_clusters(mut self, clusters: Vec<ClusterId>) -> Result<Self> {
        self.check_column("cluster", clusters.len())?;
        self.clusters = clusters;
        Ok(self)
    }

    pub fn with_fitness(mut self, fitness: Vec<f64>) -> Result<Self> {
        self.check_column("fitness", fitness.len())?;
        self.fitness = fitness;
        Ok(self)
    }

    pub fn with_strategies(mut self, strategies: Vec<LearningStrategy>) -> Result<Self> {
        self.check_column("strategy", strategies.len())?;
        self.strategies = strategies;
        Ok(self)
    }

    pub fn with_environment(mut self, environment: Trait) -> Self {
        self.environment = environment;
        self
    }

    fn check_column(&self, name: &str, len: usize) -> Result<()> {
        if len == self.len() {
            Ok(())
        } else {
            Err(SimulationError::configuration(format!(
                "{} column has {} entries for {} agents",
                name,
                len,
                self.len()
            )))
        }
    }

    pub fn len(&self) -> usize {
        self.traits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traits.is_empty()
    }

    pub fn traits(&self) -> &[Trait] {
        &self.traits
    }

    pub fn traits_mut(&mut self) -> &mut [Trait] {
        &mut self.traits
    }

    pub fn attributes(&self) -> &[f64] {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut [f64] {
        &mut self.attributes
    }

    pub fn status(&self) -> &Mask {
        &self.status
    }

    pub fn clusters(&self) -> &[ClusterId] {
        &self.clusters
    }

    pub fn clusters_mut(&mut self) -> &mut [ClusterId] {
        &mut self.clusters
    }

    /// Fitness, or skill in the demography model.
    pub fn fitness(&self) -> &[f64] {
        &self.fitness
    }

    pub fn fitness_mut(&mut self) -> &mut [f64] {
        &mut self.fitness
    }

    pub fn strategies(&self) -> &[LearningStrategy] {
        &self.strategies
    }

    pub fn strategies_mut(&mut self) -> &mut [LearningStrategy] {
        &mut self.strategies
    }

    pub fn labels(&self) -> &LabelArena {
        &self.labels
    }

    pub fn labels_mut(&mut self) -> &mut LabelArena {
        &mut self.labels
    }

    /// The state of the environment that learners try to match.
    pub fn environment(&self) -> Trait {
        self.environment
    }

    pub fn set_environment(&mut self, environment: Trait) {
        self.environment = environment;
    }

    pub fn fallbacks(&self) -> Fallbacks {
        self.fallbacks
    }

    pub fn fallbacks_mut(&mut self) -> &mut Fallbacks {
        &mut self.fallbacks
    }

    pub fn agent(&self, i: usize) -> Agent {
        Agent {
            label: self.traits[i],
            attribute: self.attributes.get(i).copied(),
            high_status: self.status.get(i).map(|b| *b),
            cluster: self.clusters.get(i).copied(),
            fitness: self.fitness.get(i).copied(),
            strategy: self.strategies.get(i).copied(),
        }
    }

    /// The mask of agents for which `predicate` holds.
    pub fn select<F>(&self, predicate: F) -> Mask
    where
        F: Fn(&Agent) -> bool,
    {
        (0..self.len()).map(|i| predicate(&self.agent(i))).collect()
    }

    pub fn count(&self, label: Trait) -> usize {
        self.traits.iter().filter(|&&t| t == label).count()
    }

    pub fn frequency(&self, label: Trait) -> f64 {
        self.count(label) as f64 / self.len() as f64
    }

    /// The traits of the selected agents, in index order.
    pub fn traits_where(&self, mask: &Mask) -> Result<Vec<Trait>> {
        self.check_column("mask", mask.len())?;
        Ok(mask.iter_ones().map(|i| self.traits[i]).collect())
    }

    /// Give every selected agent the trait `label`.
    pub fn assign_traits(&mut self, mask: &Mask, label: Trait) -> Result<()> {
        self.check_column("mask", mask.len())?;
        for i in mask.iter_ones() {
            self.traits[i] = label;
        }
        self.labels.issued = self.labels.issued.max(label);
        Ok(())
    }

    /// Give the selected agents, in index order, the traits in `labels`.
    pub fn assign_traits_from(&mut self, mask: &Mask, labels: &[Trait]) -> Result<()> {
        self.assign_where(Population::traits_mut, mask, labels)?;
        if let Some(&highest) = labels.iter().max() {
            self.labels.issued = self.labels.issued.max(highest);
        }
        Ok(())
    }

    /**
    Write `values`, in index order, into one column of the selected agents.

    The column is named by its accessor, so the same call serves traits,
    attributes, clusters, fitness and strategies:

    ```rust
    use model::population::{Mask, Population, A, B};
    let mut population = Population::new(vec![A, B, A])
        .unwrap()
        .with_clusters(vec![1, 1, 2])
        .unwrap();
    let mut moved = Mask::repeat(false, 3);
    moved.set(1, true);
    population
        .assign_where(Population::clusters_mut, &moved, &[2])
        .unwrap();
    assert_eq!(population.clusters(), &[1, 2, 2]);
    ```

    Writing to a column the population does not carry is an error. Trait
    writes should go through [`Population::assign_traits_from`], which also
    advances the label counter. Status is fixed at initialization.
     */
    pub fn assign_where<T: Clone>(
        &mut self,
        column: fn(&mut Population) -> &mut [T],
        mask: &Mask,
        values: &[T],
    ) -> Result<()> {
        self.check_column("mask", mask.len())?;
        if mask.count_ones() != values.len() {
            return Err(SimulationError::configuration(format!(
                "{} values for {} selected agents",
                values.len(),
                mask.count_ones()
            )));
        }
        let n = self.len();
        let column = column(self);
        if column.len() != n {
            return Err(SimulationError::configuration(format!(
                "column has {} entries for {} agents",
                column.len(),
                n
            )));
        }
        for (i, value) in mask.iter_ones().zip(values) {
            column[i] = value.clone();
        }
        Ok(())
    }

    /// An immutable copy, used as the "previous generation" while the next
    /// one is built from it.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot(self.clone())
    }
}

/// A frozen generation. It dereferences to [`Population`] for reading but
/// offers no way to write.
pub struct Snapshot(Population);

impl Deref for Snapshot {
    type Target = Population;
    fn deref(&self) -> &Population {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> Population {
        Population::new(vec![A, B, A, B, B]).unwrap()
    }

    #[test]
    fn empty_population_is_rejected() {
        assert!(Population::new(vec![]).is_err());
    }

    #[test]
    fn columns_must_match_population_size() {
        assert!(small().with_attributes(vec![0.5; 4]).is_err());
        assert!(small().with_clusters(vec![1; 5]).is_ok());
        let status: Mask = [true, false].iter().copied().collect();
        assert!(small().with_status(status).is_err());
    }

    #[test]
    fn masked_read_and_write() {
        let mut population = small();
        let bs = population.select(|agent| agent.label == B);
        assert_eq!(bs.count_ones(), 3);
        assert_eq!(population.traits_where(&bs).unwrap(), vec![B, B, B]);

        population.assign_traits_from(&bs, &[7, 8, 9]).unwrap();
        assert_eq!(population.traits(), &[A, 7, A, 8, 9]);
        assert_eq!(population.labels().highest(), 9);

        let first_two: Mask = [true, true, false, false, false].iter().copied().collect();
        population.assign_traits(&first_two, B).unwrap();
        assert_eq!(population.traits(), &[B, B, A, 8, 9]);

        assert!(population.assign_traits_from(&first_two, &[1]).is_err());
        let wrong_length: Mask = [true].iter().copied().collect();
        assert!(population.assign_traits(&wrong_length, A).is_err());
    }

    #[test]
    fn masked_write_reaches_every_column() {
        let mut population = small()
            .with_attributes(vec![0.0; 5])
            .unwrap()
            .with_clusters(vec![1; 5])
            .unwrap()
            .with_fitness(vec![1.0; 5])
            .unwrap()
            .with_strategies(vec![LearningStrategy::Social; 5])
            .unwrap();
        let odd: Mask = [false, true, false, true, false].iter().copied().collect();
        population
            .assign_where(Population::attributes_mut, &odd, &[0.25, 0.75])
            .unwrap();
        population
            .assign_where(Population::clusters_mut, &odd, &[2, 3])
            .unwrap();
        population
            .assign_where(Population::fitness_mut, &odd, &[0.5, 0.5])
            .unwrap();
        population
            .assign_where(
                Population::strategies_mut,
                &odd,
                &[LearningStrategy::Critical, LearningStrategy::Individual],
            )
            .unwrap();
        assert_eq!(population.attributes(), &[0.0, 0.25, 0.0, 0.75, 0.0]);
        assert_eq!(population.clusters(), &[1, 2, 1, 3, 1]);
        assert_eq!(population.fitness(), &[1.0, 0.5, 1.0, 0.5, 1.0]);
        assert_eq!(population.strategies()[1], LearningStrategy::Critical);
        assert_eq!(population.strategies()[3], LearningStrategy::Individual);
        assert_eq!(population.traits(), small().traits());

        assert!(population
            .assign_where(Population::clusters_mut, &odd, &[2])
            .is_err());
        assert!(small()
            .assign_where(Population::clusters_mut, &odd, &[2, 3])
            .is_err());
    }

    #[test]
    fn snapshot_is_independent_of_later_writes() {
        let mut population = small();
        let previous = population.snapshot();
        population.traits_mut()[0] = B;
        assert_eq!(previous.traits()[0], A);
        assert_eq!(population.traits()[0], B);
    }

    #[test]
    fn agent_view_reports_unused_columns_as_absent() {
        let population = small().with_clusters(vec![1, 1, 2, 2, 2]).unwrap();
        let agent = population.agent(3);
        assert_eq!(agent.label, B);
        assert_eq!(agent.cluster, Some(2));
        assert_eq!(agent.attribute, None);
        assert_eq!(agent.high_status, None);
    }

    #[test]
    fn initial_frequency_is_respected() {
        let mut rng = RandomSource::seed_from(11);
        let p_0 = Probability::new("p_0", 0.3).unwrap();
        let population = Population::with_initial_frequency(20_000, p_0, &mut rng).unwrap();
        assert!((population.frequency(A) - 0.3).abs() < 0.02);
        assert_eq!(population.count(A) + population.count(B), 20_000);
    }

    #[test]
    fn uniform_traits_cover_the_alphabet() {
        let mut rng = RandomSource::seed_from(12);
        let population = Population::with_uniform_traits(1000, 4, &mut rng).unwrap();
        for label in 1..=4 {
            assert!(population.count(label) > 150);
        }
        assert_eq!(population.labels().highest(), 4);
    }

    #[test]
    fn weighted_traits_skip_zero_weights() {
        let mut rng = RandomSource::seed_from(13);
        let population = Population::with_weighted_traits(500, &[1.0, 0.0, 1.0], &mut rng).unwrap();
        assert_eq!(population.count(2), 0);
        assert!(population.count(1) > 0 && population.count(3) > 0);
    }

    #[test]
    fn label_arena_never_reissues() {
        let mut labels = LabelArena::starting_after(10);
        let first = labels.issue(3, None).unwrap();
        let second = labels.issue(2, None).unwrap();
        assert_eq!(first, 11..=13);
        assert_eq!(second, 14..=15);
        assert_eq!(labels.issue(0, None).map(|r| r.count()), Some(0));
        assert_eq!(labels.issue(1, Some(15)), None);
        assert_eq!(labels.highest(), 15);

        let mut full = LabelArena::starting_after(Trait::MAX - 1);
        assert_eq!(full.issue(2, None), None);
        assert_eq!(full.issue(1, None), Some(Trait::MAX..=Trait::MAX));
        assert_eq!(full.issue(1, None), None);
    }
}
