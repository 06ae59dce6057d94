use serde_derive::{Deserialize, Serialize};

use crate::error::{Result, SimulationError};

/**
Probability is a number with a range.

Every rate in the models (transmission biases, mutation rates, conformity
strength, contact and migration probabilities) is carried as a
`Probability`. The only way to construct one from an arbitrary float is
[`Probability::new`], which rejects anything outside [0, 1] (and NaN)
instead of clamping it.

```rust
use model::probability::Probability;
assert!(Probability::new("mu", 0.25).is_ok());
assert!(Probability::new("mu", 1.25).is_err());
assert_eq!(Probability::new("mu", 0.25).unwrap().complement().value(), 0.75);
```
 */
#[derive(Default, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Probability {
    p: f64,
}

impl Probability {
    pub const ZERO: Probability = Probability { p: 0.0 };
    pub const ONE: Probability = Probability { p: 1.0 };

    pub fn new(name: &'static str, p: f64) -> Result<Self> {
        if (0.0..=1.0).contains(&p) {
            Ok(Probability { p })
        } else {
            Err(SimulationError::ProbabilityOutOfRange { name, value: p })
        }
    }

    pub fn value(self) -> f64 {
        self.p
    }

    pub fn complement(self) -> Self {
        Probability { p: 1.0 - self.p }
    }
}

impl TryFrom<f64> for Probability {
    type Error = SimulationError;
    fn try_from(p: f64) -> Result<Self> {
        Probability::new("probability", p)
    }
}

impl From<Probability> for f64 {
    fn from(p: Probability) -> f64 {
        p.p
    }
}

impl std::fmt::Debug for Probability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "p={:.4}", self.p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_values_outside_unit_interval() {
        assert!(Probability::new("s_a", -0.01).is_err());
        assert!(Probability::new("s_a", 1.0001).is_err());
        assert!(Probability::new("s_a", f64::NAN).is_err());
        assert!(Probability::new("s_a", 0.0).is_ok());
        assert!(Probability::new("s_a", 1.0).is_ok());
    }

    #[test]
    fn error_names_the_parameter() {
        match Probability::new("p_m", 2.0) {
            Err(SimulationError::ProbabilityOutOfRange { name, value }) => {
                assert_eq!(name, "p_m");
                assert_eq!(value, 2.0);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn deserialization_is_checked() {
        let ok: std::result::Result<Probability, _> = serde_json::from_str("0.5");
        assert_eq!(ok.unwrap().value(), 0.5);
        let bad: std::result::Result<Probability, _> = serde_json::from_str("3.0");
        assert!(bad.is_err());
    }
}
