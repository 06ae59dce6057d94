/*!
# 7. Submodels

Each submodel is one transmission process. All of them implement
[`UpdateRule`]: given the previous generation (read only) and the run's
random source, construct the next generation. The previous generation is
borrowed immutably and the next one is a fresh value, so a rule cannot read
a half-written generation.
 */

use crate::error::Result;
use crate::population::{Population, Trait};
use crate::random::RandomSource;

pub mod conformity;
pub mod critical_learning;
pub mod demography;
pub mod demonstrator;
pub mod direct;
pub mod innovation;
pub mod migration;
pub mod mutation;
pub mod openness;
pub mod unbiased;
pub mod vertical;

pub use conformity::ConformistBias;
pub use critical_learning::{CriticalLearning, LearningDraws};
pub use demography::DemographySkill;
pub use demonstrator::DemonstratorBias;
pub use direct::DirectBias;
pub use innovation::{CapacityPolicy, MultiTraitInnovation};
pub use migration::GroupStructuredMigration;
pub use mutation::BiasedMutation;
pub use openness::OpennessConservatism;
pub use unbiased::UnbiasedCopy;
pub use vertical::{VerticalHorizontal, VerticalTransmission};

pub trait UpdateRule: Send + Sync {
    fn name(&self) -> &'static str;

    /// A freshly randomised first generation of `n` agents.
    fn initialize(&self, n: usize, rng: &mut RandomSource) -> Result<Population>;

    /// The generation following `previous`.
    fn next_generation(&self, previous: &Population, rng: &mut RandomSource) -> Result<Population>;
}

/// For every agent, the trait of one demonstrator drawn uniformly, with
/// replacement, from `previous`.
pub(crate) fn copied_traits(previous: &Population, rng: &mut RandomSource) -> Result<Vec<Trait>> {
    let n = previous.len();
    Ok(rng
        .sample_with_replacement(n, n)?
        .into_iter()
        .map(|i| previous.traits()[i])
        .collect())
}
