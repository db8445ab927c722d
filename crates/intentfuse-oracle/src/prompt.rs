//! Chat prompts for the two oracle calls.

use intentfuse_core::{AmbiguitySet, CANONICAL_LABELS, Label};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

const CATEGORY_GUIDE: &str = "\
- Aggregate/Time-Based: counts, totals, averages or trends, usually over a time window.
- Factual: a single fact that can be looked up directly.
- Global Sensing/Summary: an overview or summary of a whole body of material.
- Multi-Part: several distinct questions asked together.
- Reasoning/Inference: asks why, or needs conclusions drawn from evidence.";

fn system_prompt() -> String {
    format!(
        "You classify user queries by intent. The categories are:\n{CATEGORY_GUIDE}\n\n\
         Answer with exactly one of: {}. Reply with the category name only.",
        CANONICAL_LABELS.join(", ")
    )
}

/// Messages for classifying a query with no local signals.
pub fn classification_messages(text: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(system_prompt()),
        ChatMessage::user(format!("Query: {text}")),
    ]
}

/// Messages for settling a disagreement between the local classifiers.
///
/// Candidates are listed in the ambiguity set's rank order with their
/// ensemble probabilities.
pub fn adjudication_messages(
    text: &str,
    single_label: &Label,
    ambiguity: &AmbiguitySet,
) -> Vec<ChatMessage> {
    let candidates = ambiguity
        .ranked()
        .iter()
        .map(|(label, p)| format!("- {label} ({p:.2})"))
        .collect::<Vec<_>>()
        .join("\n");

    vec![
        ChatMessage::system(system_prompt()),
        ChatMessage::user(format!(
            "Query: {text}\n\n\
             Two classifiers disagree on this query.\n\
             The fine-tuned classifier says: {single_label}\n\
             The ensemble's plausible categories are:\n{candidates}\n\n\
             Which category fits the query best?"
        )),
    ]
}
