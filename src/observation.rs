/*!
# 6. Observation

An [`Aggregator`] condenses one generation into a [`Summary`]. Which
summary makes sense depends on the model, so `Summary` is a sum type with
one variant per shape of output. Every summary can also be flattened into
`(category, value)` rows, which is the tabular form the experiment driver
emits as [`Record`]s.
 */

use std::collections::BTreeMap;
use std::io::Write;

use rustc_hash::FxHashMap;
use serde_derive::Serialize;

use crate::error::Result;
use crate::population::{ClusterId, LearningStrategy, Population, Trait};
use crate::{util, Generation};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Summary {
    /// Share of agents carrying one label of a binary trait.
    Frequency { label: Trait, frequency: f64 },
    /// Share of agents per trait label, for open-ended trait sets.
    Distribution { frequencies: BTreeMap<Trait, f64> },
    MeanAttribute { mean: f64 },
    Strategies {
        individual: f64,
        social: f64,
        critical: f64,
        mean_fitness: f64,
    },
    Skill { mean: f64, max: f64 },
    Clusters {
        overall: f64,
        per_cluster: BTreeMap<ClusterId, f64>,
        /// Population variance of the per-cluster frequencies.
        variance: f64,
    },
}

impl Summary {
    /// The summary as `(category, value)` rows.
    pub fn rows(&self) -> Vec<(String, f64)> {
        match self {
            Summary::Frequency { label, frequency } => {
                vec![(label_name(*label), *frequency), (complement_name(*label), 1.0 - frequency)]
            }
            Summary::Distribution { frequencies } => frequencies
                .iter()
                .map(|(label, f)| (label.to_string(), *f))
                .collect(),
            Summary::MeanAttribute { mean } => vec![("mean_attribute".to_string(), *mean)],
            Summary::Strategies {
                individual,
                social,
                critical,
                mean_fitness,
            } => vec![
                ("individual".to_string(), *individual),
                ("social".to_string(), *social),
                ("critical".to_string(), *critical),
                ("mean_fitness".to_string(), *mean_fitness),
            ],
            Summary::Skill { mean, max } => vec![
                ("mean_skill".to_string(), *mean),
                ("max_skill".to_string(), *max),
            ],
            Summary::Clusters {
                overall,
                per_cluster,
                variance,
            } => {
                let mut rows = vec![("overall".to_string(), *overall)];
                rows.extend(
                    per_cluster
                        .iter()
                        .map(|(c, f)| (format!("cluster_{}", c), *f)),
                );
                rows.push(("between_cluster_variance".to_string(), *variance));
                rows
            }
        }
    }

    /// The value reported under `category`, if any.
    pub fn value(&self, category: &str) -> Option<f64> {
        self.rows()
            .into_iter()
            .find(|(c, _)| c == category)
            .map(|(_, v)| v)
    }
}

fn label_name(label: Trait) -> String {
    match label {
        crate::population::A => "A".to_string(),
        crate::population::B => "B".to_string(),
        other => other.to_string(),
    }
}

fn complement_name(label: Trait) -> String {
    match label {
        crate::population::A => "B".to_string(),
        crate::population::B => "A".to_string(),
        other => format!("not_{}", other),
    }
}

/// A pure reduction of one generation.
pub trait Aggregator: Send + Sync {
    fn summarize(&self, population: &Population) -> Summary;
}

pub struct TraitFrequency {
    pub label: Trait,
}

impl Aggregator for TraitFrequency {
    fn summarize(&self, population: &Population) -> Summary {
        Summary::Frequency {
            label: self.label,
            frequency: population.frequency(self.label),
        }
    }
}

pub struct TraitDistribution;

impl Aggregator for TraitDistribution {
    fn summarize(&self, population: &Population) -> Summary {
        let mut counts: FxHashMap<Trait, usize> = FxHashMap::default();
        for &label in population.traits() {
            *counts.entry(label).or_insert(0) += 1;
        }
        let n = population.len() as f64;
        Summary::Distribution {
            frequencies: counts
                .into_iter()
                .map(|(label, count)| (label, count as f64 / n))
                .collect(),
        }
    }
}

pub struct MeanAttribute;

impl Aggregator for MeanAttribute {
    fn summarize(&self, population: &Population) -> Summary {
        Summary::MeanAttribute {
            mean: util::mean(population.attributes()),
        }
    }
}

pub struct StrategyProportions;

impl Aggregator for StrategyProportions {
    fn summarize(&self, population: &Population) -> Summary {
        let n = population.len() as f64;
        let share = |s: LearningStrategy| {
            population.strategies().iter().filter(|&&t| t == s).count() as f64 / n
        };
        Summary::Strategies {
            individual: share(LearningStrategy::Individual),
            social: share(LearningStrategy::Social),
            critical: share(LearningStrategy::Critical),
            mean_fitness: util::mean(population.fitness()),
        }
    }
}

pub struct SkillStatistics;

impl Aggregator for SkillStatistics {
    fn summarize(&self, population: &Population) -> Summary {
        Summary::Skill {
            mean: util::mean(population.fitness()),
            max: population
                .fitness()
                .iter()
                .copied()
                .fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

/// Frequency of `label` overall and within each of the clusters `1..=clusters`.
/// An empty cluster reports frequency 0 and is left out of the variance.
pub struct ClusterFrequencies {
    pub label: Trait,
    pub clusters: ClusterId,
}

impl Aggregator for ClusterFrequencies {
    fn summarize(&self, population: &Population) -> Summary {
        let mut carriers = vec![0usize; self.clusters as usize + 1];
        let mut sizes = vec![0usize; self.clusters as usize + 1];
        for (&label, &cluster) in population.traits().iter().zip(population.clusters()) {
            if let Some(size) = sizes.get_mut(cluster as usize) {
                *size += 1;
                if label == self.label {
                    carriers[cluster as usize] += 1;
                }
            }
        }
        let per_cluster: BTreeMap<ClusterId, f64> = (1..=self.clusters)
            .map(|c| {
                let size = sizes[c as usize];
                let f = if size == 0 {
                    0.0
                } else {
                    carriers[c as usize] as f64 / size as f64
                };
                (c, f)
            })
            .collect();
        let occupied: Vec<f64> = (1..=self.clusters)
            .filter(|&c| sizes[c as usize] > 0)
            .map(|c| per_cluster[&c])
            .collect();
        Summary::Clusters {
            overall: population.frequency(self.label),
            per_cluster,
            variance: util::variance(&occupied),
        }
    }
}

/// One row of output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub cell: usize,
    pub replicate: usize,
    pub generation: Generation,
    pub category: String,
    pub value: f64,
}

/// The value of `category` in the last generation of every replicate of
/// `cell`, in replicate order.
pub fn final_values(records: &[Record], cell: usize, category: &str) -> Vec<f64> {
    let mut last: BTreeMap<usize, (Generation, f64)> = BTreeMap::new();
    for r in records.iter().filter(|r| r.cell == cell && r.category == category) {
        let entry = last.entry(r.replicate).or_insert((r.generation, r.value));
        if r.generation >= entry.0 {
            *entry = (r.generation, r.value);
        }
    }
    last.into_values().map(|(_, v)| v).collect()
}

/// The first generation at which a frequency trajectory hits 0 or 1.
pub fn fixation_generation(trajectory: &[(Generation, f64)]) -> Option<Generation> {
    trajectory
        .iter()
        .find(|(_, f)| *f <= 0.0 || *f >= 1.0)
        .map(|(t, _)| *t)
}

/// The trajectory of `category` for one replicate of one cell.
pub fn trajectory(
    records: &[Record],
    cell: usize,
    replicate: usize,
    category: &str,
) -> Vec<(Generation, f64)> {
    let mut points: Vec<(Generation, f64)> = records
        .iter()
        .filter(|r| r.cell == cell && r.replicate == replicate && r.category == category)
        .map(|r| (r.generation, r.value))
        .collect();
    points.sort_by_key(|(t, _)| *t);
    points
}

/// The mean over replicates of `category`, per generation.
pub fn mean_trajectory(records: &[Record], cell: usize, category: &str) -> Vec<(Generation, f64)> {
    let mut sums: BTreeMap<Generation, (f64, usize)> = BTreeMap::new();
    for r in records.iter().filter(|r| r.cell == cell && r.category == category) {
        let entry = sums.entry(r.generation).or_insert((0.0, 0));
        entry.0 += r.value;
        entry.1 += 1;
    }
    sums.into_iter()
        .map(|(t, (sum, count))| (t, sum / count as f64))
        .collect()
}

/// Generation-to-generation changes of a trajectory.
pub fn changes(trajectory: &[(Generation, f64)]) -> Vec<f64> {
    trajectory.windows(2).map(|w| w[1].1 - w[0].1).collect()
}

/// The average change in mean skill per generation, over all replicates of
/// `cell`.
pub fn mean_skill_change(records: &[Record], cell: usize) -> f64 {
    util::mean(&changes(&mean_trajectory(records, cell, "mean_skill")))
}

/// The sample correlation of the frequency trajectories of two clusters in
/// one replicate.
pub fn cluster_correlation(
    records: &[Record],
    cell: usize,
    replicate: usize,
    first: ClusterId,
    second: ClusterId,
) -> f64 {
    let values = |c: ClusterId| -> Vec<f64> {
        trajectory(records, cell, replicate, &format!("cluster_{}", c))
            .into_iter()
            .map(|(_, v)| v)
            .collect()
    };
    util::correlation(&values(first), &values(second))
}

/// Write records as a comma-separated table with a header line, or as one
/// JSON array.
pub fn write_records<W: Write>(records: &[Record], json: bool, mut writer: W) -> Result<()> {
    if json {
        serde_json::to_writer(&mut writer, records)?;
        writeln!(writer)?;
    } else {
        writeln!(writer, "cell,replicate,generation,category,value")?;
        for r in records {
            writeln!(
                writer,
                "{},{},{},{},{}",
                r.cell, r.replicate, r.generation, r.category, r.value
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::population::{A, B};
    use approx::assert_abs_diff_eq;

    #[test]
    fn binary_rows_sum_to_one() {
        let population = Population::new(vec![A, B, B, B]).unwrap();
        let summary = TraitFrequency { label: A }.summarize(&population);
        assert_eq!(summary.value("A"), Some(0.25));
        assert_eq!(summary.value("B"), Some(0.75));
        let total: f64 = summary.rows().iter().map(|(_, v)| v).sum();
        assert_abs_diff_eq!(total, 1.0);
    }

    #[test]
    fn distribution_covers_every_label() {
        let population = Population::new(vec![3, 3, 7, 1]).unwrap();
        match TraitDistribution.summarize(&population) {
            Summary::Distribution { frequencies } => {
                assert_eq!(frequencies.keys().copied().collect::<Vec<_>>(), vec![1, 3, 7]);
                assert_abs_diff_eq!(frequencies[&3], 0.5);
            }
            other => panic!("unexpected summary {:?}", other),
        }
    }

    #[test]
    fn cluster_frequencies_and_variance() {
        let population = Population::new(vec![A, A, B, B, A, B])
            .unwrap()
            .with_clusters(vec![1, 1, 2, 2, 3, 3])
            .unwrap();
        let summary = ClusterFrequencies {
            label: A,
            clusters: 4,
        }
        .summarize(&population);
        assert_eq!(summary.value("cluster_1"), Some(1.0));
        assert_eq!(summary.value("cluster_2"), Some(0.0));
        assert_eq!(summary.value("cluster_3"), Some(0.5));
        assert_eq!(summary.value("cluster_4"), Some(0.0));
        assert_eq!(summary.value("overall"), Some(0.5));
        // Variance over the three occupied clusters only.
        assert_abs_diff_eq!(summary.value("between_cluster_variance").unwrap(), 1.0 / 6.0);
    }

    #[test]
    fn skill_statistics() {
        let population = Population::uniform(3, A)
            .unwrap()
            .with_fitness(vec![1.0, -2.0, 4.0])
            .unwrap();
        assert_eq!(
            SkillStatistics.summarize(&population),
            Summary::Skill { mean: 1.0, max: 4.0 }
        );
    }

    fn record(replicate: usize, generation: Generation, value: f64) -> Record {
        Record {
            cell: 0,
            replicate,
            generation,
            category: "A".to_string(),
            value,
        }
    }

    #[test]
    fn helpers_over_records() {
        let records = vec![
            record(0, 2, 0.5),
            record(0, 1, 0.4),
            record(1, 1, 0.6),
            record(1, 2, 1.0),
            record(0, 3, 0.0),
            record(1, 3, 1.0),
        ];
        assert_eq!(final_values(&records, 0, "A"), vec![0.0, 1.0]);
        assert_eq!(
            mean_trajectory(&records, 0, "A"),
            vec![(1, 0.5), (2, 0.75), (3, 0.5)]
        );
        assert_eq!(fixation_generation(&trajectory(&records, 0, 0, "A")), Some(3));
        assert_eq!(fixation_generation(&trajectory(&records, 0, 1, "A")), Some(2));
        assert_eq!(changes(&[(1, 0.0), (2, 0.5), (3, 0.25)]), vec![0.5, -0.25]);
    }

    #[test]
    fn csv_output_has_a_header() {
        let mut out = Vec::new();
        write_records(&[record(0, 1, 0.5)], false, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "cell,replicate,generation,category,value\n0,0,1,A,0.5\n");
    }
}
