use serde::{Deserialize, Serialize};

use crate::error::ArbiterError;

pub const DEFAULT_PROB_DIFF_THRESHOLD: f64 = 0.2;
pub const DEFAULT_UNCERTAINTY_THRESHOLD: f64 = 1.0;

/// Tunables for the arbitration engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArbiterConfig {
    /// Maximum gap to the arg-max probability for a label to stay in the
    /// ambiguity set. Inclusive.
    pub prob_diff_threshold: f64,
    /// Reserved second uncertainty criterion; carried but not applied.
    pub uncertainty_threshold: f64,
    /// Reject oracle answers outside the canonical taxonomy instead of
    /// passing them through.
    pub validate_oracle: bool,
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        Self {
            prob_diff_threshold: DEFAULT_PROB_DIFF_THRESHOLD,
            uncertainty_threshold: DEFAULT_UNCERTAINTY_THRESHOLD,
            validate_oracle: false,
        }
    }
}

impl ArbiterConfig {
    pub fn validate(&self) -> Result<(), ArbiterError> {
        for (name, value) in [
            ("prob_diff_threshold", self.prob_diff_threshold),
            ("uncertainty_threshold", self.uncertainty_threshold),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ArbiterError::Config(format!(
                    "{name} must be a finite non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }
}
