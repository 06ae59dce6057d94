use tracing::debug;

use crate::error::{Result, SimulationError};
use crate::parameters::MigrationParameters;
use crate::population::{ClusterId, Mask, Population};
use crate::probability::Probability;
use crate::random::RandomSource;
use crate::submodels::UpdateRule;

/**
Cultural transmission between groups linked by contact and migration.

Agents belong to one of `clusters` groups. Each generation a single observer
is drawn uniformly. Every other agent is a potential demonstrator, weighted
by `(same_cluster + p_c) / (1 + p_c)`, so that with `p_c = 0` only members
of the observer's own cluster can be copied. The observer adopts the trait
of one demonstrator drawn by these weights. Then, with probability `p_m`,
the observer moves to a different cluster chosen uniformly.

An observer with no eligible demonstrator (alone in its cluster, with
`p_c = 0`) keeps its trait; the skip is logged and counted in the
population's fallbacks.
 */
#[derive(Debug, Clone)]
pub struct GroupStructuredMigration {
    pub p_0: Probability,
    pub clusters: ClusterId,
    pub p_c: Probability,
    pub p_m: Probability,
}

impl GroupStructuredMigration {
    pub fn new(p: &MigrationParameters) -> Result<Self> {
        if p.clusters < 1 {
            return Err(SimulationError::configuration("need at least one cluster"));
        }
        Ok(GroupStructuredMigration {
            p_0: Probability::new("p_0", p.p_0)?,
            clusters: p.clusters,
            p_c: Probability::new("p_c", p.p_c)?,
            p_m: Probability::new("p_m", p.p_m)?,
        })
    }

    /// Contact weights of all agents as demonstrators for `observer`.
    pub fn contact_weights(&self, population: &Population, observer: usize) -> Vec<f64> {
        let own = population.clusters()[observer];
        let p_c = self.p_c.value();
        population
            .clusters()
            .iter()
            .enumerate()
            .map(|(j, &cluster)| {
                if j == observer {
                    0.0
                } else {
                    let same = if cluster == own { 1.0 } else { 0.0 };
                    (same + p_c) / (1.0 + p_c)
                }
            })
            .collect()
    }

    /// A cluster other than `current`, uniformly.
    fn destination(&self, current: ClusterId, rng: &mut RandomSource) -> Result<ClusterId> {
        let r = rng.below(self.clusters as usize - 1)? as ClusterId + 1;
        Ok(if r >= current { r + 1 } else { r })
    }
}

impl UpdateRule for GroupStructuredMigration {
    fn name(&self) -> &'static str {
        "group_structured_migration"
    }

    fn initialize(&self, n: usize, rng: &mut RandomSource) -> Result<Population> {
        let population = Population::with_initial_frequency(n, self.p_0, rng)?;
        let mut clusters = Vec::with_capacity(n);
        for _ in 0..n {
            clusters.push(rng.below(self.clusters as usize)? as ClusterId + 1);
        }
        population.with_clusters(clusters)
    }

    fn next_generation(&self, previous: &Population, rng: &mut RandomSource) -> Result<Population> {
        let mut next = previous.clone();
        let observer = rng.below(previous.len())?;
        let mut observed = Mask::repeat(false, previous.len());
        observed.set(observer, true);
        match rng.categorical(&self.contact_weights(previous, observer)) {
            Ok(demonstrator) => {
                next.assign_traits_from(&observed, &[previous.traits()[demonstrator]])?;
            }
            Err(SimulationError::DegenerateDistribution) => {
                debug!(
                    observer,
                    cluster = previous.clusters()[observer],
                    "no demonstrator in contact, observer keeps its trait"
                );
                next.fallbacks_mut().skipped_transitions += 1;
            }
            Err(e) => return Err(e),
        }
        if self.clusters > 1 && rng.bernoulli(self.p_m) {
            let current = previous.clusters()[observer];
            let destination = self.destination(current, rng)?;
            next.assign_where(Population::clusters_mut, &observed, &[destination])?;
        }
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::population::{A, B};

    fn rule(p_c: f64, p_m: f64) -> GroupStructuredMigration {
        GroupStructuredMigration::new(&MigrationParameters {
            p_0: 0.5,
            clusters: 3,
            p_c,
            p_m,
        })
        .unwrap()
    }

    #[test]
    fn observer_is_never_its_own_demonstrator() {
        let population = Population::new(vec![A, B, A])
            .unwrap()
            .with_clusters(vec![1, 1, 2])
            .unwrap();
        let weights = rule(0.0, 0.0).contact_weights(&population, 0);
        assert_eq!(weights, vec![0.0, 1.0, 0.0]);
        let weights = rule(1.0, 0.0).contact_weights(&population, 0);
        assert_eq!(weights, vec![0.0, 1.0, 0.5]);
    }

    #[test]
    fn isolated_observer_is_skipped_not_fatal() {
        let rule = rule(0.0, 0.0);
        let mut rng = RandomSource::seed_from(71);
        let population = Population::new(vec![A, B])
            .unwrap()
            .with_clusters(vec![1, 2])
            .unwrap();
        let next = rule.next_generation(&population, &mut rng).unwrap();
        assert_eq!(next.traits(), population.traits());
        assert_eq!(next.fallbacks().skipped_transitions, 1);
    }

    #[test]
    fn migrants_always_change_cluster() {
        let rule = rule(0.5, 1.0);
        let mut rng = RandomSource::seed_from(72);
        let mut population = rule.initialize(30, &mut rng).unwrap();
        for _ in 0..500 {
            let next = rule.next_generation(&population, &mut rng).unwrap();
            let moved = population
                .clusters()
                .iter()
                .zip(next.clusters())
                .filter(|(a, b)| a != b)
                .count();
            assert_eq!(moved, 1);
            assert!(next.clusters().iter().all(|&c| (1..=3).contains(&c)));
            population = next;
        }
    }

    #[test]
    fn at_most_one_agent_changes_per_generation() {
        let rule = rule(0.2, 0.1);
        let mut rng = RandomSource::seed_from(73);
        let mut population = rule.initialize(50, &mut rng).unwrap();
        for _ in 0..200 {
            let next = rule.next_generation(&population, &mut rng).unwrap();
            let changed = population
                .traits()
                .iter()
                .zip(next.traits())
                .filter(|(a, b)| a != b)
                .count();
            assert!(changed <= 1);
            population = next;
        }
    }
}
