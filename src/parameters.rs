use itertools::Itertools;
use serde_derive::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, SimulationError};
use crate::observation::{
    Aggregator, ClusterFrequencies, MeanAttribute, SkillStatistics, StrategyProportions,
    TraitDistribution, TraitFrequency,
};
use crate::population::{ClusterId, Trait, A};
use crate::submodels::*;
use crate::{Generation, Model};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct UnbiasedParameters {
    pub p_0: f64,
}

impl Default for UnbiasedParameters {
    fn default() -> Self {
        UnbiasedParameters { p_0: 0.5 }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct MutationParameters {
    pub p_0: f64,
    pub mu_a: f64,
    pub mu_b: f64,
}

impl Default for MutationParameters {
    fn default() -> Self {
        // Mutation only towards A, starting from an all-B population.
        MutationParameters {
            p_0: 0.0,
            mu_a: 0.0,
            mu_b: 0.05,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct DirectBiasParameters {
    pub p_0: f64,
    pub s_a: f64,
    pub s_b: f64,
}

impl Default for DirectBiasParameters {
    fn default() -> Self {
        DirectBiasParameters {
            p_0: 0.01,
            s_a: 0.1,
            s_b: 0.0,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ConformityParameters {
    pub p_0: f64,
    pub d: f64,
}

impl Default for ConformityParameters {
    fn default() -> Self {
        ConformityParameters { p_0: 0.55, d: 0.1 }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct DemonstratorParameters {
    pub p_0: f64,
    pub p_s: f64,
    pub p_low: f64,
}

impl Default for DemonstratorParameters {
    fn default() -> Self {
        DemonstratorParameters {
            p_0: 0.5,
            p_s: 0.05,
            p_low: 0.0001,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct VerticalParameters {
    pub p_0: f64,
    pub b: f64,
}

impl Default for VerticalParameters {
    fn default() -> Self {
        VerticalParameters { p_0: 0.01, b: 0.6 }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct VerticalHorizontalParameters {
    pub p_0: f64,
    pub b: f64,
    /// Number of horizontal demonstrators.
    pub n: usize,
    pub g: f64,
}

impl Default for VerticalHorizontalParameters {
    fn default() -> Self {
        VerticalHorizontalParameters {
            p_0: 0.01,
            b: 0.5,
            n: 5,
            g: 0.1,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct InnovationParameters {
    /// Size of the initial trait alphabet.
    pub m: Trait,
    pub mu: f64,
    pub capacity: CapacityPolicy,
}

impl Default for InnovationParameters {
    fn default() -> Self {
        InnovationParameters {
            m: 5,
            mu: 0.01,
            capacity: CapacityPolicy::Unbounded,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct OpennessParameters {
    pub mu: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct CriticalLearningParameters {
    /// Baseline fitness.
    pub w: f64,
    /// Benefit of correct behaviour, and cost of a wrong one.
    pub b: f64,
    /// Cost of individual learning, as a fraction of b.
    pub c: f64,
    /// Cost of social learning, as a fraction of b.
    pub s: f64,
    /// Success probability of individual learning.
    pub p: f64,
    pub mu: f64,
    /// Rate of environmental change.
    pub u: f64,
    pub draws: LearningDraws,
}

impl Default for CriticalLearningParameters {
    fn default() -> Self {
        CriticalLearningParameters {
            w: 1.0,
            b: 0.5,
            c: 0.9,
            s: 0.0,
            p: 1.0,
            mu: 0.01,
            u: 0.2,
            draws: LearningDraws::Shared,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct DemographyParameters {
    /// Location shift of the skill distribution below the best model.
    pub alpha: f64,
    /// Scale of the skill distribution.
    pub beta: f64,
}

impl Default for DemographyParameters {
    fn default() -> Self {
        DemographyParameters {
            alpha: 7.0,
            beta: 1.0,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct MigrationParameters {
    pub p_0: f64,
    pub clusters: ClusterId,
    /// Contact between clusters.
    pub p_c: f64,
    /// Migration probability.
    pub p_m: f64,
}

impl Default for MigrationParameters {
    fn default() -> Self {
        MigrationParameters {
            p_0: 0.5,
            clusters: 2,
            p_c: 0.0,
            p_m: 0.0,
        }
    }
}

/**
The parameters of one model, tagged with the model's name.

```rust
use model::parameters::ModelParameters;
let parameters = ModelParameters::by_name("conformist_bias").unwrap();
let stronger = parameters.with_value("d", 1.0).unwrap();
assert_eq!(stronger.name(), "conformist_bias");
assert!(stronger.with_value("s_a", 0.1).is_err());
```
 */
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ModelParameters {
    UnbiasedCopy(UnbiasedParameters),
    BiasedMutation(MutationParameters),
    DirectBias(DirectBiasParameters),
    ConformistBias(ConformityParameters),
    DemonstratorBias(DemonstratorParameters),
    VerticalTransmission(VerticalParameters),
    VerticalHorizontal(VerticalHorizontalParameters),
    MultiTraitInnovation(InnovationParameters),
    OpennessConservatism(OpennessParameters),
    CriticalLearner(CriticalLearningParameters),
    DemographySkill(DemographyParameters),
    GroupStructuredMigration(MigrationParameters),
}

impl ModelParameters {
    /// Every model, with its reference parameters.
    pub fn all() -> Vec<ModelParameters> {
        vec![
            ModelParameters::UnbiasedCopy(Default::default()),
            ModelParameters::BiasedMutation(Default::default()),
            ModelParameters::DirectBias(Default::default()),
            ModelParameters::ConformistBias(Default::default()),
            ModelParameters::DemonstratorBias(Default::default()),
            ModelParameters::VerticalTransmission(Default::default()),
            ModelParameters::VerticalHorizontal(Default::default()),
            ModelParameters::MultiTraitInnovation(Default::default()),
            ModelParameters::OpennessConservatism(Default::default()),
            ModelParameters::CriticalLearner(Default::default()),
            ModelParameters::DemographySkill(Default::default()),
            ModelParameters::GroupStructuredMigration(Default::default()),
        ]
    }

    pub fn by_name(name: &str) -> Result<Self> {
        ModelParameters::all()
            .into_iter()
            .find(|p| p.name() == name)
            .ok_or_else(|| {
                SimulationError::configuration(format!(
                    "unknown model `{}`, expected one of: {}",
                    name,
                    ModelParameters::all().iter().map(|p| p.name()).join(", ")
                ))
            })
    }

    pub fn name(&self) -> &'static str {
        match self {
            ModelParameters::UnbiasedCopy(_) => "unbiased_copy",
            ModelParameters::BiasedMutation(_) => "biased_mutation",
            ModelParameters::DirectBias(_) => "direct_bias",
            ModelParameters::ConformistBias(_) => "conformist_bias",
            ModelParameters::DemonstratorBias(_) => "demonstrator_bias",
            ModelParameters::VerticalTransmission(_) => "vertical_transmission",
            ModelParameters::VerticalHorizontal(_) => "vertical_horizontal",
            ModelParameters::MultiTraitInnovation(_) => "multi_trait_innovation",
            ModelParameters::OpennessConservatism(_) => "openness_conservatism",
            ModelParameters::CriticalLearner(_) => "critical_learner",
            ModelParameters::DemographySkill(_) => "demography_skill",
            ModelParameters::GroupStructuredMigration(_) => "group_structured_migration",
        }
    }

    /// The update rule with its default aggregator. Fails if any parameter
    /// is out of range.
    pub fn build(&self) -> Result<Model> {
        let frequency = || -> Box<dyn Aggregator> { Box::new(TraitFrequency { label: A }) };
        Ok(match self {
            ModelParameters::UnbiasedCopy(p) => Model::new(UnbiasedCopy::new(p)?, frequency()),
            ModelParameters::BiasedMutation(p) => Model::new(BiasedMutation::new(p)?, frequency()),
            ModelParameters::DirectBias(p) => Model::new(DirectBias::new(p)?, frequency()),
            ModelParameters::ConformistBias(p) => Model::new(ConformistBias::new(p)?, frequency()),
            ModelParameters::DemonstratorBias(p) => {
                Model::new(DemonstratorBias::new(p)?, frequency())
            }
            ModelParameters::VerticalTransmission(p) => {
                Model::new(VerticalTransmission::new(p)?, frequency())
            }
            ModelParameters::VerticalHorizontal(p) => {
                Model::new(VerticalHorizontal::new(p)?, frequency())
            }
            ModelParameters::MultiTraitInnovation(p) => {
                Model::new(MultiTraitInnovation::new(p)?, Box::new(TraitDistribution))
            }
            ModelParameters::OpennessConservatism(p) => {
                Model::new(OpennessConservatism::new(p)?, Box::new(MeanAttribute))
            }
            ModelParameters::CriticalLearner(p) => {
                Model::new(CriticalLearning::new(p)?, Box::new(StrategyProportions))
            }
            ModelParameters::DemographySkill(p) => {
                Model::new(DemographySkill::new(p)?, Box::new(SkillStatistics))
            }
            ModelParameters::GroupStructuredMigration(p) => Model::new(
                GroupStructuredMigration::new(p)?,
                Box::new(ClusterFrequencies {
                    label: A,
                    clusters: p.clusters,
                }),
            ),
        })
    }

    pub fn validate(&self) -> Result<()> {
        self.build().map(|_| ())
    }

    /// A copy with the numeric parameter `name` set to `value`.
    pub fn with_value(&self, name: &str, value: f64) -> Result<Self> {
        let mut tagged = serde_json::to_value(self)?;
        let fields = tagged
            .as_object_mut()
            .and_then(|outer| outer.values_mut().next())
            .and_then(Value::as_object_mut)
            .ok_or_else(|| {
                SimulationError::configuration(format!(
                    "{} has no named parameters",
                    self.name()
                ))
            })?;
        let field = fields
            .get_mut(name)
            .ok_or_else(|| SimulationError::UnknownParameter {
                name: name.to_string(),
            })?;
        let replacement = match &*field {
            Value::Number(n) if n.is_u64() => {
                if value.fract() != 0.0 || value < 0.0 {
                    return Err(SimulationError::configuration(format!(
                        "{} must be a whole number, got {}",
                        name, value
                    )));
                }
                Value::from(value as u64)
            }
            Value::Number(_) => serde_json::Number::from_f64(value)
                .map(Value::Number)
                .ok_or_else(|| {
                    SimulationError::configuration(format!("{} = {} is not a number", name, value))
                })?,
            _ => {
                return Err(SimulationError::configuration(format!(
                    "{} is not a numeric parameter",
                    name
                )))
            }
        };
        *field = replacement;
        Ok(serde_json::from_value(tagged)?)
    }
}

/// The shape of a batch of runs.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct RunSettings {
    pub population_size: usize,
    pub max_t: Generation,
    pub replicates: usize,
    pub seed: u64,
    /// Size of the worker pool; 0 lets the pool pick one worker per core.
    pub workers: usize,
}

impl Default for RunSettings {
    fn default() -> Self {
        RunSettings {
            population_size: 1000,
            max_t: 200,
            replicates: 5,
            seed: 0,
            workers: 0,
        }
    }
}

impl RunSettings {
    pub fn validate(&self) -> Result<()> {
        if self.population_size < 1 {
            return Err(SimulationError::configuration(
                "population size must be at least 1",
            ));
        }
        if self.max_t < 1 {
            return Err(SimulationError::configuration(
                "a run needs at least one generation",
            ));
        }
        if self.replicates < 1 {
            return Err(SimulationError::configuration(
                "need at least one replicate",
            ));
        }
        Ok(())
    }
}

/// One point of a parameter grid.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Cell {
    pub index: usize,
    /// The values of the grid axes at this point, in axis order.
    pub values: Vec<(String, f64)>,
    pub parameters: ModelParameters,
}

/**
A cartesian grid over named numeric parameters. The last axis varies
fastest.

```rust
use model::parameters::{ModelParameters, ParameterGrid};
let mut grid = ParameterGrid::default();
grid.push("s_a", vec![0.1, 0.2]).unwrap();
grid.push("p_0", vec![0.01, 0.1, 0.5]).unwrap();
let cells = grid.cells(&ModelParameters::by_name("direct_bias").unwrap()).unwrap();
assert_eq!(cells.len(), 6);
assert_eq!(cells[1].values, vec![("s_a".to_string(), 0.1), ("p_0".to_string(), 0.1)]);
```
 */
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct ParameterGrid {
    pub axes: Vec<(String, Vec<f64>)>,
}

impl ParameterGrid {
    pub fn push(&mut self, name: &str, values: Vec<f64>) -> Result<()> {
        if values.is_empty() {
            return Err(SimulationError::configuration(format!(
                "axis {} has no values",
                name
            )));
        }
        self.axes.push((name.to_string(), values));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.axes.iter().map(|(_, values)| values.len()).product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All grid points applied to `base`. A grid without axes has the single
    /// cell `base`.
    pub fn cells(&self, base: &ModelParameters) -> Result<Vec<Cell>> {
        if self.axes.is_empty() {
            return Ok(vec![Cell {
                index: 0,
                values: vec![],
                parameters: base.clone(),
            }]);
        }
        if let Some((name, _)) = self.axes.iter().find(|(_, values)| values.is_empty()) {
            return Err(SimulationError::configuration(format!(
                "axis {} has no values",
                name
            )));
        }
        self.axes
            .iter()
            .map(|(name, values)| values.iter().map(move |&v| (name.clone(), v)))
            .multi_cartesian_product()
            .enumerate()
            .map(|(index, values)| {
                let mut parameters = base.clone();
                for (name, value) in &values {
                    parameters = parameters.with_value(name, *value)?;
                }
                Ok(Cell {
                    index,
                    values,
                    parameters,
                })
            })
            .collect()
    }
}

/// Parse an axis given as `name=v1,v2,...`.
pub fn parse_axis(axis: &str) -> Result<(String, Vec<f64>)> {
    let (name, values) = axis.split_once('=').ok_or_else(|| {
        SimulationError::configuration(format!("expected name=v1,v2,..., got {}", axis))
    })?;
    let values = values
        .split(',')
        .map(|v| {
            v.trim().parse::<f64>().map_err(|e| {
                SimulationError::configuration(format!("axis {}: {}: {}", name, v, e))
            })
        })
        .collect::<Result<Vec<f64>>>()?;
    Ok((name.trim().to_string(), values))
}
