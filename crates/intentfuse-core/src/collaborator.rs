//! Interfaces the arbitration engine consumes.
//!
//! Implementations are loaded once per process and shared read-only across
//! requests, so every trait requires `Send + Sync`. Errors are plain
//! `anyhow::Error`; the engine tags them with the [`Stage`](crate::Stage)
//! that produced them.

use async_trait::async_trait;

use crate::distribution::ProbabilityDistribution;
use crate::label::Label;
use crate::resolver::AmbiguitySet;

/// Turns query text into the fixed-length vector the ensemble was trained on.
pub trait FeatureAssembler: Send + Sync {
    fn assemble(&self, text: &str) -> anyhow::Result<Vec<f32>>;

    /// Length of every vector returned by [`assemble`](Self::assemble).
    fn dim(&self) -> usize;
}

/// A classifier that scores every label it knows.
pub trait ProbabilisticClassifier: Send + Sync {
    fn predict_proba(&self, features: &[f32]) -> anyhow::Result<ProbabilityDistribution>;
}

/// Raw output of a single-label classifier, before canonicalization.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeVerdict {
    pub token: String,
    pub confidence: f32,
}

/// A classifier that picks exactly one label from its own vocabulary.
pub trait SingleLabelClassifier: Send + Sync {
    fn classify(&self, text: &str) -> anyhow::Result<NativeVerdict>;
}

/// External, higher-cost reasoning service.
///
/// Answers are free-form strings; the engine passes them through unless
/// oracle validation is switched on.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Classify `text` with no local signals.
    async fn classify(&self, text: &str) -> anyhow::Result<String>;

    /// Settle a disagreement between the single-label verdict and the
    /// ensemble's ambiguity set.
    async fn adjudicate(
        &self,
        text: &str,
        single_label: &Label,
        ambiguity: &AmbiguitySet,
    ) -> anyhow::Result<String>;
}
