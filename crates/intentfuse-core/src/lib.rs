pub mod arbiter;
pub mod collaborator;
pub mod config;
pub mod distribution;
pub mod error;
pub mod label;
pub mod resolver;
pub mod wire;

pub use arbiter::{
    ArbitrationResult, Arbiter, Collaborators, Outcome, Provenance, Query, Source,
    StrategyMode, Verdict,
};
pub use collaborator::{
    FeatureAssembler, NativeVerdict, Oracle, ProbabilisticClassifier, SingleLabelClassifier,
};
pub use config::ArbiterConfig;
pub use distribution::ProbabilityDistribution;
pub use error::{ArbiterError, DistributionError, Stage};
pub use label::{CANONICAL_LABELS, Label, LabelMap};
pub use resolver::{AmbiguitySet, Resolver, resolve};
pub use wire::{ClassifyRequest, ClassifyResponse, ErrorResponse, Prediction};
