//! Canonical intent taxonomy and native-token canonicalization.
//!
//! Every classifier speaks its own label vocabulary. Before two verdicts are
//! compared they are mapped onto the five canonical categories through a
//! single [`LabelMap`] handed to the engine at construction.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ArbiterError;

pub const AGGREGATE_TIME_BASED: &str = "Aggregate/Time-Based";
pub const FACTUAL: &str = "Factual";
pub const GLOBAL_SENSING_SUMMARY: &str = "Global Sensing/Summary";
pub const MULTI_PART: &str = "Multi-Part";
pub const REASONING_INFERENCE: &str = "Reasoning/Inference";

/// The canonical taxonomy, in the enumeration order the classifiers were trained with.
pub const CANONICAL_LABELS: [&str; 5] = [
    AGGREGATE_TIME_BASED,
    FACTUAL,
    GLOBAL_SENSING_SUMMARY,
    MULTI_PART,
    REASONING_INFERENCE,
];

/// An intent label.
///
/// Usually one of [`CANONICAL_LABELS`], but deliberately not restricted to
/// them: oracle answers are carried verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Label(String);

impl Label {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this label is a member of the canonical taxonomy.
    pub fn is_canonical(&self) -> bool {
        CANONICAL_LABELS.contains(&self.0.as_str())
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Label {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Label {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Label {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl PartialEq<str> for Label {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Label {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Immutable lookup table from a classifier's native tokens to canonical labels.
#[derive(Debug, Clone, Default)]
pub struct LabelMap {
    table: HashMap<String, Label>,
}

impl LabelMap {
    /// Build a table from `(native_token, canonical_label)` pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Label>,
    {
        Self {
            table: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// The table for the fine-tuned transformer, which emits `LABEL_0`..`LABEL_4`
    /// in canonical enumeration order.
    pub fn roberta_default() -> Self {
        Self::from_pairs(
            CANONICAL_LABELS
                .iter()
                .enumerate()
                .map(|(i, &label)| (format!("LABEL_{i}"), label)),
        )
    }

    /// Map a native token to its canonical label.
    ///
    /// Unknown tokens mean the model and the table are out of sync; they are
    /// never defaulted.
    pub fn canonicalize(&self, token: &str) -> Result<Label, ArbiterError> {
        self.table
            .get(token)
            .cloned()
            .ok_or_else(|| ArbiterError::UnknownLabelToken {
                token: token.to_string(),
            })
    }

    /// Labels the table maps onto, in no particular order.
    pub fn targets(&self) -> impl Iterator<Item = &Label> {
        self.table.values()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
