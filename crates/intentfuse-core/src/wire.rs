//! Request/response shapes shared by every front end.
//!
//! Mirrors the `/classify` contract: `{ "text", "type" }` in,
//! `{ "prediction" }` out, where the prediction is a single label or, for
//! the ensemble strategy, a ranked list.

use serde::{Deserialize, Serialize};

use crate::arbiter::{Query, StrategyMode};
use crate::error::ArbiterError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifyRequest {
    pub text: String,
    /// `Ensemble`, `Roberta`, `Chatgpt`; anything else means full arbitration.
    #[serde(rename = "type", default)]
    pub kind: String,
}

impl ClassifyRequest {
    pub fn mode(&self) -> StrategyMode {
        StrategyMode::from_wire(&self.kind)
    }

    pub fn into_query(self) -> Result<Query, ArbiterError> {
        let mode = self.mode();
        Query::new(self.text, mode)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Prediction {
    Label(String),
    Labels(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifyResponse {
    pub prediction: Prediction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
