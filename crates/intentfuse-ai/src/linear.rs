//! Multinomial logistic-regression ensemble head.
//!
//! Loads a JSON export of a trained linear model:
//!
//! ```json
//! {
//!   "classes":   ["Aggregate/Time-Based", "Factual", ...],
//!   "coef":      [[...], [...], ...],
//!   "intercept": [..., ...]
//! }
//! ```
//!
//! `coef` has one row per class, each as wide as the assembled feature
//! vector. Probabilities are `softmax(coef · x + intercept)`.

use std::path::Path;

use anyhow::Context;
use intentfuse_core::{Label, ProbabilisticClassifier, ProbabilityDistribution};
use serde::Deserialize;
use tracing::info;

use crate::softmax::softmax;

#[derive(Deserialize)]
struct LinearModelFile {
    classes: Vec<String>,
    coef: Vec<Vec<f64>>,
    intercept: Vec<f64>,
}

#[derive(Debug)]
pub struct LinearClassifier {
    classes: Vec<Label>,
    coef: Vec<Vec<f64>>,
    intercept: Vec<f64>,
    n_features: usize,
}

impl LinearClassifier {
    /// Load a model from its JSON export.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading linear model {}", path.display()))?;
        let file: LinearModelFile = serde_json::from_str(&raw)
            .with_context(|| format!("parsing linear model {}", path.display()))?;

        let model = Self::new(
            file.classes.into_iter().map(Label::new).collect(),
            file.coef,
            file.intercept,
        )?;
        info!(
            classes = model.classes.len(),
            n_features = model.n_features,
            model = %path.display(),
            "loaded linear ensemble model"
        );
        Ok(model)
    }

    pub fn new(
        classes: Vec<Label>,
        coef: Vec<Vec<f64>>,
        intercept: Vec<f64>,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(!classes.is_empty(), "model has no classes");
        anyhow::ensure!(
            coef.len() == classes.len() && intercept.len() == classes.len(),
            "shape mismatch: {} classes, {} coef rows, {} intercepts",
            classes.len(),
            coef.len(),
            intercept.len()
        );

        let n_features = coef[0].len();
        anyhow::ensure!(n_features > 0, "model has zero-width coefficients");
        for (label, row) in classes.iter().zip(&coef) {
            anyhow::ensure!(
                row.len() == n_features,
                "coef row for {label} has {} features, expected {n_features}",
                row.len()
            );
        }
        anyhow::ensure!(
            coef.iter().flatten().chain(&intercept).all(|w| w.is_finite()),
            "model contains non-finite weights"
        );

        Ok(Self {
            classes,
            coef,
            intercept,
            n_features,
        })
    }

    /// Input width the model was trained on.
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn classes(&self) -> &[Label] {
        &self.classes
    }

    fn logits(&self, x: &[f32]) -> Vec<f64> {
        self.coef
            .iter()
            .zip(&self.intercept)
            .map(|(row, b)| {
                row.iter()
                    .zip(x)
                    .map(|(w, &xi)| w * f64::from(xi))
                    .sum::<f64>()
                    + b
            })
            .collect()
    }
}

impl ProbabilisticClassifier for LinearClassifier {
    fn predict_proba(&self, features: &[f32]) -> anyhow::Result<ProbabilityDistribution> {
        anyhow::ensure!(
            features.len() == self.n_features,
            "expected {} features, got {}",
            self.n_features,
            features.len()
        );
        anyhow::ensure!(
            features.iter().all(|x| x.is_finite()),
            "feature vector contains non-finite values"
        );

        let probs = softmax(&self.logits(features));
        Ok(ProbabilityDistribution::from_parts(&self.classes, &probs)?)
    }
}
