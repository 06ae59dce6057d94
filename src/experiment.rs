/*!
Replicates and parameter sweeps.

An experiment is a set of independent runs, one per pair of grid cell and
replicate. Every run gets its own [`RandomSource`] derived from the
experiment seed and the run's `(cell, replicate)` identity, so results do
not depend on how runs are scheduled over the worker pool. The runs are
executed as tasks on a `rayon` pool and report back over a channel, and the
result table is assembled in `(cell, replicate)` order once all of them have
finished.
 */

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;

use itertools::Itertools;
use serde_derive::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, SimulationError};
use crate::observation::{write_records, Record};
use crate::parameters::{Cell, ModelParameters, ParameterGrid, RunSettings};
use crate::population::Fallbacks;
use crate::random::RandomSource;
use crate::{Model, Trajectory};

/// What to do when a cell cannot be configured or one of its runs fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Abandon the experiment and return the first error.
    FailFast,
    /// Report the failure and keep the results of every other run.
    Continue,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        FailurePolicy::FailFast
    }
}

#[derive(Debug, Clone)]
pub struct Experiment {
    pub model: ModelParameters,
    pub settings: RunSettings,
    pub grid: ParameterGrid,
    pub failure_policy: FailurePolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Failure {
    pub cell: usize,
    /// `None` if the cell could not be configured at all.
    pub replicate: Option<usize>,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperimentResult {
    pub model: &'static str,
    pub settings: RunSettings,
    pub cells: Vec<Cell>,
    pub records: Vec<Record>,
    pub failures: Vec<Failure>,
    /// Runs that took a fallback, as `(cell, replicate, fallbacks)`.
    pub fallbacks: Vec<(usize, usize, Fallbacks)>,
}

impl ExperimentResult {
    /// Write the whole result as JSON, or the records as a table preceded by
    /// one `#` comment line per cell and per failure.
    pub fn write<W: Write>(&self, json: bool, mut writer: W) -> Result<()> {
        if json {
            serde_json::to_writer(&mut writer, self)?;
            writeln!(writer)?;
            return Ok(());
        }
        for cell in &self.cells {
            writeln!(
                writer,
                "# cell {}: {} {}",
                cell.index,
                self.model,
                cell.values
                    .iter()
                    .map(|(name, value)| format!("{}={}", name, value))
                    .join(" ")
            )?;
        }
        for failure in &self.failures {
            writeln!(
                writer,
                "# failed: cell {} replicate {:?}: {}",
                failure.cell, failure.replicate, failure.error
            )?;
        }
        write_records(&self.records, false, writer)
    }
}

impl Experiment {
    /// Independent replicates of a single parameter set.
    pub fn replicates(model: ModelParameters, settings: RunSettings) -> Self {
        Experiment {
            model,
            settings,
            grid: ParameterGrid::default(),
            failure_policy: FailurePolicy::default(),
        }
    }

    pub fn sweep(model: ModelParameters, settings: RunSettings, grid: ParameterGrid) -> Self {
        Experiment {
            model,
            settings,
            grid,
            failure_policy: FailurePolicy::default(),
        }
    }

    pub fn with_failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }

    pub fn run(&self) -> Result<ExperimentResult> {
        self.settings.validate()?;
        let cells = self.grid.cells(&self.model)?;

        // Configure every cell before the first run starts.
        let mut failures = vec![];
        let mut models: Vec<(usize, Model)> = Vec::with_capacity(cells.len());
        for cell in &cells {
            match cell.parameters.build() {
                Ok(model) => models.push((cell.index, model)),
                Err(e) => match self.failure_policy {
                    FailurePolicy::FailFast => return Err(e),
                    FailurePolicy::Continue => {
                        warn!(cell = cell.index, error = %e, "cell cannot be configured, skipping");
                        failures.push(Failure {
                            cell: cell.index,
                            replicate: None,
                            error: e.to_string(),
                        });
                    }
                },
            }
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.settings.workers)
            .build()
            .map_err(|e| SimulationError::configuration(format!("worker pool: {}", e)))?;
        info!(
            model = self.model.name(),
            cells = cells.len(),
            replicates = self.settings.replicates,
            workers = pool.current_num_threads(),
            "starting experiment"
        );

        let outcomes = self.execute(&pool, &models);

        let mut records = vec![];
        let mut fallbacks = vec![];
        for ((cell, replicate), outcome) in outcomes {
            match outcome {
                Ok(trajectory) => {
                    if trajectory.fallbacks.any() {
                        fallbacks.push((cell, replicate, trajectory.fallbacks));
                    }
                    records.extend(trajectory.records(cell, replicate));
                }
                Err(e) => match self.failure_policy {
                    FailurePolicy::FailFast => return Err(e),
                    FailurePolicy::Continue => {
                        warn!(cell, replicate, error = %e, "run failed");
                        failures.push(Failure {
                            cell,
                            replicate: Some(replicate),
                            error: e.to_string(),
                        });
                    }
                },
            }
        }
        info!(
            records = records.len(),
            failures = failures.len(),
            "experiment finished"
        );
        Ok(ExperimentResult {
            model: self.model.name(),
            settings: self.settings.clone(),
            cells,
            records,
            failures,
            fallbacks,
        })
    }

    /// Run every replicate of every configured cell on `pool`. With
    /// [`FailurePolicy::FailFast`], tasks that have not started yet are
    /// dropped after the first failure.
    fn execute(
        &self,
        pool: &rayon::ThreadPool,
        models: &[(usize, Model)],
    ) -> BTreeMap<(usize, usize), Result<Trajectory>> {
        let (sender, receiver) = mpsc::channel();
        let abort = AtomicBool::new(false);
        let settings = &self.settings;
        let fail_fast = self.failure_policy == FailurePolicy::FailFast;
        pool.scope(|s| {
            for (cell, model) in models {
                for replicate in 0..settings.replicates {
                    let sender = sender.clone();
                    let abort = &abort;
                    s.spawn(move |_| {
                        if abort.load(Ordering::Relaxed) {
                            return;
                        }
                        let mut rng = RandomSource::for_task(settings.seed, *cell, replicate);
                        let outcome =
                            model.simulate(settings.population_size, settings.max_t, &mut rng);
                        if fail_fast && outcome.is_err() {
                            abort.store(true, Ordering::Relaxed);
                        }
                        // The receiver outlives the scope.
                        let _ = sender.send(((*cell, replicate), outcome));
                    });
                }
            }
        });
        drop(sender);
        receiver.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::{MigrationParameters, ParameterGrid};

    fn settings(workers: usize) -> RunSettings {
        RunSettings {
            population_size: 50,
            max_t: 30,
            replicates: 6,
            seed: 2024,
            workers,
        }
    }

    #[test]
    fn results_do_not_depend_on_the_number_of_workers() {
        let mut grid = ParameterGrid::default();
        grid.push("s_a", vec![0.0, 0.2]).unwrap();
        let model = ModelParameters::by_name("direct_bias").unwrap();
        let one = Experiment::sweep(model.clone(), settings(1), grid.clone())
            .run()
            .unwrap();
        let four = Experiment::sweep(model, settings(4), grid).run().unwrap();
        assert_eq!(one.records, four.records);
        assert_eq!(one.records.len(), 2 * 6 * 30 * 2);
    }

    #[test]
    fn replicates_differ_from_each_other() {
        let result = Experiment::replicates(
            ModelParameters::by_name("unbiased_copy").unwrap(),
            settings(2),
        )
        .run()
        .unwrap();
        let finals = crate::observation::final_values(&result.records, 0, "A");
        assert_eq!(finals.len(), 6);
        assert!(finals.iter().any(|&f| f != finals[0]));
    }

    #[test]
    fn invalid_cell_fails_fast_by_default() {
        let mut grid = ParameterGrid::default();
        grid.push("p_0", vec![0.5, 1.5]).unwrap();
        let model = ModelParameters::by_name("unbiased_copy").unwrap();
        let outcome = Experiment::sweep(model, settings(2), grid).run();
        assert!(matches!(
            outcome,
            Err(SimulationError::ProbabilityOutOfRange { .. })
        ));
    }

    #[test]
    fn continuing_keeps_the_valid_cells() {
        let mut grid = ParameterGrid::default();
        grid.push("p_0", vec![0.5, 1.5]).unwrap();
        let model = ModelParameters::by_name("unbiased_copy").unwrap();
        let result = Experiment::sweep(model, settings(2), grid)
            .with_failure_policy(FailurePolicy::Continue)
            .run()
            .unwrap();
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].cell, 1);
        assert!(result.records.iter().all(|r| r.cell == 0));
        assert_eq!(result.cells.len(), 2);
    }

    #[test]
    fn run_failures_are_reported_per_replicate() {
        let model = ModelParameters::MultiTraitInnovation(crate::parameters::InnovationParameters {
            m: 2,
            mu: 0.5,
            capacity: crate::submodels::CapacityPolicy::Fail { capacity: 10 },
        });
        let result = Experiment::replicates(model.clone(), settings(3))
            .with_failure_policy(FailurePolicy::Continue)
            .run()
            .unwrap();
        assert_eq!(result.failures.len(), 6);
        assert!(result.records.is_empty());
        assert!(matches!(
            Experiment::replicates(model, settings(3)).run(),
            Err(SimulationError::LabelExhaustion { capacity: 10 })
        ));
    }

    #[test]
    fn fallbacks_are_reported() {
        let model = ModelParameters::GroupStructuredMigration(MigrationParameters {
            p_0: 0.5,
            clusters: 50,
            p_c: 0.0,
            p_m: 0.0,
        });
        let mut settings = settings(2);
        settings.population_size = 10;
        let result = Experiment::replicates(model, settings).run().unwrap();
        assert!(!result.fallbacks.is_empty());
    }
}
