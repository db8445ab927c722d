//! `resolve` subcommand: run the ambiguity resolver on a hand-written distribution.

use std::collections::BTreeMap;

use anyhow::Context;
use intentfuse_core::{Label, ProbabilityDistribution, resolve};
use serde::Serialize;

#[derive(Serialize)]
struct Ranked<'a> {
    label: &'a str,
    probability: f64,
}

#[derive(Serialize)]
struct ResolveOutput<'a> {
    threshold: f64,
    set: Vec<Ranked<'a>>,
}

/// Parse `{ "label": p, ... }`, resolve it, and render the ranked set as JSON.
///
/// Object keys are read in sorted order, so that is the tie-break order.
pub fn resolve_json(probs: &str, threshold: f64) -> anyhow::Result<String> {
    anyhow::ensure!(
        threshold.is_finite() && threshold >= 0.0,
        "threshold must be a finite non-negative number, got {threshold}"
    );
    let raw: BTreeMap<String, f64> =
        serde_json::from_str(probs).context("--probs must be a JSON object of label to probability")?;
    let dist = ProbabilityDistribution::new(
        raw.into_iter().map(|(k, p)| (Label::new(k), p)).collect(),
    )?;

    let set = resolve(&dist, threshold);
    let output = ResolveOutput {
        threshold,
        set: set
            .ranked()
            .iter()
            .map(|(label, probability)| Ranked {
                label: label.as_str(),
                probability: *probability,
            })
            .collect(),
    };
    Ok(serde_json::to_string(&output)?)
}
