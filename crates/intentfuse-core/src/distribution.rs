//! Probability distributions produced by the ensemble classifier.

use std::collections::HashSet;

use crate::error::DistributionError;
use crate::label::Label;

/// An ordered mapping from label to probability.
///
/// Order is the classifier's enumeration order and is what breaks exact ties
/// during ambiguity resolution. Values are comparable within one distribution
/// but are not required to sum to exactly 1.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityDistribution {
    entries: Vec<(Label, f64)>,
}

impl ProbabilityDistribution {
    pub fn new(mut entries: Vec<(Label, f64)>) -> Result<Self, DistributionError> {
        if entries.is_empty() {
            return Err(DistributionError::Empty);
        }

        // -0.0 and 0.0 must rank as an exact tie.
        for (_, p) in &mut entries {
            *p += 0.0;
        }

        let mut seen = HashSet::with_capacity(entries.len());
        for (label, p) in &entries {
            if !p.is_finite() || !(0.0..=1.0).contains(p) {
                return Err(DistributionError::InvalidProbability {
                    label: label.clone(),
                    value: *p,
                });
            }
            if !seen.insert(label.as_str()) {
                return Err(DistributionError::DuplicateLabel(label.clone()));
            }
        }

        Ok(Self { entries })
    }

    /// Pair up class names and probabilities, as returned by a `predict_proba` call.
    pub fn from_parts(
        classes: &[Label],
        probabilities: &[f64],
    ) -> Result<Self, DistributionError> {
        if classes.len() != probabilities.len() {
            return Err(DistributionError::WidthMismatch {
                classes: classes.len(),
                probabilities: probabilities.len(),
            });
        }
        Self::new(classes.iter().cloned().zip(probabilities.iter().copied()).collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Label, f64)> {
        self.entries.iter().map(|(l, p)| (l, *p))
    }

    pub fn get(&self, label: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(l, _)| l.as_str() == label)
            .map(|(_, p)| *p)
    }

    /// The highest-probability label; the earliest one wins an exact tie.
    pub fn argmax(&self) -> (&Label, f64) {
        let mut best = &self.entries[0];
        for entry in &self.entries[1..] {
            if entry.1 > best.1 {
                best = entry;
            }
        }
        (&best.0, best.1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
