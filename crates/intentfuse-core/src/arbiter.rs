//! Arbitration engine.
//!
//! Reconciles the single-label classifier with the ensemble's ambiguity set
//! and escalates to the oracle only when they disagree:
//!
//! | Mode          | Collaborators used                         | Output          |
//! |---------------|--------------------------------------------|-----------------|
//! | `Ensemble`    | assembler → ensemble → resolver            | ambiguity set   |
//! | `SingleLabel` | single-label classifier → label map        | one label       |
//! | `Oracle`      | oracle                                     | oracle answer   |
//! | `Arbitrated`  | all of the above, oracle only on conflict  | one label       |
//!
//! Collaborator failures are returned as-is: no retries, no fallbacks.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::collaborator::{FeatureAssembler, Oracle, ProbabilisticClassifier, SingleLabelClassifier};
use crate::config::ArbiterConfig;
use crate::error::{ArbiterError, Stage};
use crate::label::{Label, LabelMap};
use crate::resolver::{AmbiguitySet, Resolver};
use crate::wire::Prediction;

/// Classification strategy requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StrategyMode {
    Ensemble,
    SingleLabel,
    Oracle,
    #[default]
    Arbitrated,
}

impl StrategyMode {
    /// Map the request's `type` field. Anything unrecognised selects `Arbitrated`.
    pub fn from_wire(kind: &str) -> Self {
        match kind {
            "Ensemble" => Self::Ensemble,
            "Roberta" => Self::SingleLabel,
            "Chatgpt" => Self::Oracle,
            _ => Self::Arbitrated,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ensemble => "ensemble",
            Self::SingleLabel => "single-label",
            Self::Oracle => "oracle",
            Self::Arbitrated => "arbitrated",
        }
    }
}

/// A validated request: non-empty text plus the strategy to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    text: String,
    mode: StrategyMode,
}

impl Query {
    pub fn new(text: impl Into<String>, mode: StrategyMode) -> Result<Self, ArbiterError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(ArbiterError::EmptyQuery);
        }
        Ok(Self { text, mode })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn mode(&self) -> StrategyMode {
        self.mode
    }
}

/// Which collaborator produced a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Source {
    Ensemble,
    SingleLabel,
    Oracle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub label: Label,
    pub source: Source,
}

/// How an arbitrated label was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    /// The single-label verdict was inside the ensemble's tolerance band.
    Agreement,
    /// The signals conflicted and the oracle decided.
    Escalated,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Agreement => "agreement",
            Self::Escalated => "escalated",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArbitrationResult {
    pub label: Label,
    pub provenance: Provenance,
    pub single_label: Label,
    pub ambiguity: AmbiguitySet,
}

/// Result of running one [`Query`].
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Ensemble(AmbiguitySet),
    SingleLabel(Verdict),
    Oracle(Verdict),
    Arbitrated(ArbitrationResult),
}

impl Outcome {
    /// Shape the outcome for the `{ "prediction": ... }` response.
    pub fn into_prediction(self) -> Prediction {
        match self {
            Self::Ensemble(set) => {
                Prediction::Labels(set.into_labels().into_iter().map(Label::into_string).collect())
            }
            Self::SingleLabel(v) | Self::Oracle(v) => Prediction::Label(v.label.into_string()),
            Self::Arbitrated(r) => Prediction::Label(r.label.into_string()),
        }
    }
}

/// The collaborator handles an [`Arbiter`] runs against.
#[derive(Clone)]
pub struct Collaborators {
    pub assembler: Arc<dyn FeatureAssembler>,
    pub ensemble: Arc<dyn ProbabilisticClassifier>,
    pub single_label: Arc<dyn SingleLabelClassifier>,
    pub oracle: Arc<dyn Oracle>,
}

pub struct Arbiter {
    collaborators: Collaborators,
    labels: LabelMap,
    resolver: Resolver,
    validate_oracle: bool,
}

impl Arbiter {
    pub fn new(
        collaborators: Collaborators,
        labels: LabelMap,
        config: &ArbiterConfig,
    ) -> Result<Self, ArbiterError> {
        config.validate()?;
        Ok(Self {
            collaborators,
            labels,
            resolver: Resolver::from_config(config),
            validate_oracle: config.validate_oracle,
        })
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Run a query with the strategy it asks for.
    pub async fn run(&self, query: &Query) -> Result<Outcome, ArbiterError> {
        let start = Instant::now();
        let text = query.text();
        let outcome = match query.mode() {
            StrategyMode::Ensemble => Outcome::Ensemble(self.ensemble(text)?),
            StrategyMode::SingleLabel => Outcome::SingleLabel(Verdict {
                label: self.single_label(text)?,
                source: Source::SingleLabel,
            }),
            StrategyMode::Oracle => Outcome::Oracle(Verdict {
                label: self.oracle_only(text).await?,
                source: Source::Oracle,
            }),
            StrategyMode::Arbitrated => Outcome::Arbitrated(self.arbitrate(text).await?),
        };
        debug!(
            mode = query.mode().as_str(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "query classified"
        );
        Ok(outcome)
    }

    /// Feature assembly → ensemble → ambiguity resolution.
    pub fn ensemble(&self, text: &str) -> Result<AmbiguitySet, ArbiterError> {
        ensure_text(text)?;
        let features = self
            .collaborators
            .assembler
            .assemble(text)
            .map_err(|e| ArbiterError::collaborator(Stage::FeatureAssembly, e))?;
        let dist = self
            .collaborators
            .ensemble
            .predict_proba(&features)
            .map_err(|e| ArbiterError::collaborator(Stage::ProbabilisticClassifier, e))?;
        let set = self.resolver.resolve(&dist);
        debug!(set = ?labels_of(&set), "ensemble ambiguity set");
        Ok(set)
    }

    /// Single-label verdict, canonicalized.
    pub fn single_label(&self, text: &str) -> Result<Label, ArbiterError> {
        ensure_text(text)?;
        let native = self
            .collaborators
            .single_label
            .classify(text)
            .map_err(|e| ArbiterError::collaborator(Stage::SingleLabelClassifier, e))?;
        let label = self.labels.canonicalize(&native.token)?;
        debug!(token = %native.token, %label, confidence = native.confidence, "single-label verdict");
        Ok(label)
    }

    /// Ask the oracle directly, bypassing both classifiers.
    pub async fn oracle_only(&self, text: &str) -> Result<Label, ArbiterError> {
        ensure_text(text)?;
        let answer = self
            .collaborators
            .oracle
            .classify(text)
            .await
            .map_err(|e| ArbiterError::collaborator(Stage::Oracle, e))?;
        self.accept_oracle(answer)
    }

    /// Full arbitration: accept the single-label verdict when it lies inside
    /// the ensemble's ambiguity set, otherwise let the oracle decide.
    pub async fn arbitrate(&self, text: &str) -> Result<ArbitrationResult, ArbiterError> {
        let single_label = self.single_label(text)?;
        let ambiguity = self.ensemble(text)?;

        if ambiguity.contains(&single_label) {
            debug!(label = %single_label, "classifiers agree");
            return Ok(ArbitrationResult {
                label: single_label.clone(),
                provenance: Provenance::Agreement,
                single_label,
                ambiguity,
            });
        }

        info!(
            single_label = %single_label,
            set = ?labels_of(&ambiguity),
            "classifiers disagree, escalating to oracle"
        );
        let answer = self
            .collaborators
            .oracle
            .adjudicate(text, &single_label, &ambiguity)
            .await
            .map_err(|e| ArbiterError::collaborator(Stage::Oracle, e))?;
        let label = self.accept_oracle(answer)?;
        info!(%label, "oracle verdict");

        Ok(ArbitrationResult {
            label,
            provenance: Provenance::Escalated,
            single_label,
            ambiguity,
        })
    }

    fn accept_oracle(&self, answer: String) -> Result<Label, ArbiterError> {
        let label = Label::new(answer);
        if self.validate_oracle && !label.is_canonical() {
            return Err(ArbiterError::OracleContractViolation {
                answer: label.into_string(),
            });
        }
        Ok(label)
    }
}

fn ensure_text(text: &str) -> Result<(), ArbiterError> {
    if text.trim().is_empty() {
        return Err(ArbiterError::EmptyQuery);
    }
    Ok(())
}

fn labels_of(set: &AmbiguitySet) -> Vec<&str> {
    set.labels().map(Label::as_str).collect()
}
