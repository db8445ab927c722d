use std::fmt;

use thiserror::Error;

use crate::label::Label;

/// The collaborator stage a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    FeatureAssembly,
    ProbabilisticClassifier,
    SingleLabelClassifier,
    Oracle,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FeatureAssembly => "feature assembly",
            Self::ProbabilisticClassifier => "probabilistic classifier",
            Self::SingleLabelClassifier => "single-label classifier",
            Self::Oracle => "oracle",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum DistributionError {
    #[error("distribution has no labels")]
    Empty,

    #[error("{probabilities} probabilities for {classes} classes")]
    WidthMismatch { classes: usize, probabilities: usize },

    #[error("duplicate label in distribution: {0}")]
    DuplicateLabel(Label),

    #[error("probability for {label} is {value}, expected a finite value in [0, 1]")]
    InvalidProbability { label: Label, value: f64 },
}

#[derive(Debug, Error)]
pub enum ArbiterError {
    #[error("query text is empty")]
    EmptyQuery,

    #[error("{stage} failed: {source:#}")]
    Collaborator {
        stage: Stage,
        #[source]
        source: anyhow::Error,
    },

    #[error("unknown native label token {token:?}")]
    UnknownLabelToken { token: String },

    #[error("oracle answer {answer:?} is not a canonical label")]
    OracleContractViolation { answer: String },

    #[error("invalid distribution: {0}")]
    Distribution(#[from] DistributionError),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ArbiterError {
    pub(crate) fn collaborator(stage: Stage, source: anyhow::Error) -> Self {
        Self::Collaborator { stage, source }
    }

    /// True for failures caused by a collaborator rather than by the caller's input.
    ///
    /// An unknown native token is a model/table version mismatch and counts here.
    pub fn is_collaborator_failure(&self) -> bool {
        matches!(
            self,
            Self::Collaborator { .. } | Self::UnknownLabelToken { .. } | Self::Distribution(_)
        )
    }
}
