use thiserror::Error;

/// Everything that can go wrong while configuring or running a model.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// A parameter is outside its admissible range, or two inputs disagree
    /// (e.g. a mask whose length is not the population size).
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("probability `{name}` must lie in [0, 1], got {value}")]
    ProbabilityOutOfRange { name: &'static str, value: f64 },

    /// A selection was required from a set whose weights are all zero.
    #[error("cannot sample from a distribution whose weights are all zero")]
    DegenerateDistribution,

    #[error("trait label space exhausted (capacity {capacity})")]
    LabelExhaustion { capacity: u32 },

    #[error("population size changed from {expected} to {found} during a transition")]
    PopulationSizeChanged { expected: usize, found: usize },

    #[error("model has no parameter called `{name}`")]
    UnknownParameter { name: String },

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SimulationError>;

impl SimulationError {
    pub fn configuration<S: Into<String>>(reason: S) -> Self {
        SimulationError::Configuration(reason.into())
    }
}
