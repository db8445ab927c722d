//! Ambiguity resolution: turn a probability distribution into the set of
//! labels that cannot be told apart from the best one.
//!
//! A label survives when its probability is within `prob_diff_threshold` of
//! the arg-max (inclusive). Labels are ranked by descending probability and
//! exact ties keep the classifier's enumeration order.

use serde::Serialize;

use crate::config::ArbiterConfig;
use crate::distribution::ProbabilityDistribution;
use crate::label::Label;

/// A non-empty, ranked set of labels. The first element is always the arg-max.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AmbiguitySet {
    ranked: Vec<(Label, f64)>,
}

impl AmbiguitySet {
    /// The arg-max label.
    pub fn top(&self) -> &Label {
        &self.ranked[0].0
    }

    pub fn top_probability(&self) -> f64 {
        self.ranked[0].1
    }

    pub fn contains(&self, label: &Label) -> bool {
        self.ranked.iter().any(|(l, _)| l == label)
    }

    pub fn labels(&self) -> impl Iterator<Item = &Label> {
        self.ranked.iter().map(|(l, _)| l)
    }

    /// Labels with their probabilities, highest first.
    pub fn ranked(&self) -> &[(Label, f64)] {
        &self.ranked
    }

    pub fn len(&self) -> usize {
        self.ranked.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }

    pub fn into_labels(self) -> Vec<Label> {
        self.ranked.into_iter().map(|(l, _)| l).collect()
    }
}

/// Resolve `dist` into an [`AmbiguitySet`] using an absolute probability gap.
///
/// Pure: `dist` is left untouched and repeated calls give identical output.
pub fn resolve(dist: &ProbabilityDistribution, prob_diff_threshold: f64) -> AmbiguitySet {
    let mut sorted: Vec<(&Label, f64)> = dist.iter().collect();
    // Stable sort: exact ties stay in enumeration order.
    sorted.sort_by(|a, b| b.1.total_cmp(&a.1));

    let top = sorted[0].1;
    let mut ranked = Vec::with_capacity(sorted.len());
    ranked.push((sorted[0].0.clone(), top));

    for &(label, p) in &sorted[1..] {
        if top - p <= prob_diff_threshold {
            ranked.push((label.clone(), p));
        } else {
            break;
        }
    }

    AmbiguitySet { ranked }
}

/// Ambiguity resolver bound to a configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolver {
    prob_diff_threshold: f64,
    uncertainty_threshold: f64,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::from_config(&ArbiterConfig::default())
    }
}

impl Resolver {
    pub fn new(prob_diff_threshold: f64, uncertainty_threshold: f64) -> Self {
        Self {
            prob_diff_threshold,
            uncertainty_threshold,
        }
    }

    pub fn from_config(config: &ArbiterConfig) -> Self {
        Self::new(config.prob_diff_threshold, config.uncertainty_threshold)
    }

    pub fn prob_diff_threshold(&self) -> f64 {
        self.prob_diff_threshold
    }

    pub fn uncertainty_threshold(&self) -> f64 {
        self.uncertainty_threshold
    }

    pub fn resolve(&self, dist: &ProbabilityDistribution) -> AmbiguitySet {
        let set = resolve(dist, self.prob_diff_threshold);
        self.apply_uncertainty(set)
    }

    /// Second uncertainty criterion.
    ///
    /// `uncertainty_threshold` is accepted and carried but no policy is
    /// attached to it yet: the set is returned unchanged.
    fn apply_uncertainty(&self, set: AmbiguitySet) -> AmbiguitySet {
        tracing::trace!(
            uncertainty_threshold = self.uncertainty_threshold,
            top = set.top_probability(),
            "uncertainty criterion not applied"
        );
        set
    }
}
