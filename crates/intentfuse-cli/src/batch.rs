//! Concurrent JSONL classification.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use futures::stream::{self, StreamExt};
use intentfuse_core::{Arbiter, ClassifyRequest, ClassifyResponse, ErrorResponse};
use serde::Serialize;
use tracing::{info, warn};

/// Classify each request line on its own task, at most `concurrency` at a
/// time. Responses come back in input order.
pub async fn classify_lines(
    arbiter: Arc<Arbiter>,
    lines: Vec<String>,
    concurrency: usize,
) -> Vec<String> {
    let start = Instant::now();
    let total = lines.len();

    // Tasks are spawned lazily as earlier ones finish.
    let results: Vec<_> = stream::iter(lines)
        .map(|line| {
            let arbiter = Arc::clone(&arbiter);
            tokio::spawn(async move { respond(&arbiter, &line).await })
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let mut failed = 0usize;
    let mut out = Vec::with_capacity(total);
    for (i, joined) in results.into_iter().enumerate() {
        let result = joined
            .context("classification task panicked")
            .and_then(|r| r);
        match result {
            Ok(response) => out.push(to_json(&response)),
            Err(e) => {
                failed += 1;
                warn!(line = i + 1, error = %format!("{e:#}"), "request failed");
                out.push(to_json(&ErrorResponse {
                    error: format!("{e:#}"),
                }));
            }
        }
    }

    info!(
        total,
        failed,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "batch complete"
    );
    out
}

async fn respond(arbiter: &Arbiter, line: &str) -> anyhow::Result<ClassifyResponse> {
    let request: ClassifyRequest = serde_json::from_str(line).context("invalid request")?;
    let query = request.into_query()?;
    let outcome = arbiter.run(&query).await?;
    Ok(ClassifyResponse {
        prediction: outcome.into_prediction(),
    })
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| format!(r#"{{"error":"serialize: {e}"}}"#))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use intentfuse_core::{
        AmbiguitySet, ArbiterConfig, Collaborators, FeatureAssembler, Label, LabelMap,
        NativeVerdict, Oracle, ProbabilisticClassifier, ProbabilityDistribution,
        SingleLabelClassifier,
    };

    struct LenAssembler;

    impl FeatureAssembler for LenAssembler {
        fn assemble(&self, text: &str) -> anyhow::Result<Vec<f32>> {
            Ok(vec![text.len() as f32])
        }

        fn dim(&self) -> usize {
            1
        }
    }

    /// Favours Factual for short queries and Multi-Part for long ones.
    struct LengthEnsemble;

    impl ProbabilisticClassifier for LengthEnsemble {
        fn predict_proba(&self, features: &[f32]) -> anyhow::Result<ProbabilityDistribution> {
            let (factual, multi) = if features[0] < 20.0 { (0.8, 0.2) } else { (0.1, 0.9) };
            Ok(ProbabilityDistribution::new(vec![
                (Label::from("Factual"), factual),
                (Label::from("Multi-Part"), multi),
            ])?)
        }
    }

    /// Always says Factual.
    struct FactualSingle;

    impl SingleLabelClassifier for FactualSingle {
        fn classify(&self, _text: &str) -> anyhow::Result<NativeVerdict> {
            Ok(NativeVerdict {
                token: "LABEL_1".into(),
                confidence: 0.9,
            })
        }
    }

    struct ConstOracle;

    #[async_trait]
    impl Oracle for ConstOracle {
        async fn classify(&self, _text: &str) -> anyhow::Result<String> {
            Ok("Reasoning/Inference".into())
        }

        async fn adjudicate(
            &self,
            _text: &str,
            _single_label: &Label,
            _ambiguity: &AmbiguitySet,
        ) -> anyhow::Result<String> {
            Ok("Multi-Part".into())
        }
    }

    /// Records the peak number of overlapping calls.
    #[derive(Default)]
    struct SlowOracle {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl Oracle for SlowOracle {
        async fn classify(&self, _text: &str) -> anyhow::Result<String> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok("Factual".into())
        }

        async fn adjudicate(
            &self,
            text: &str,
            _single_label: &Label,
            _ambiguity: &AmbiguitySet,
        ) -> anyhow::Result<String> {
            self.classify(text).await
        }
    }

    fn arbiter() -> Arc<Arbiter> {
        arbiter_with(Arc::new(ConstOracle))
    }

    fn arbiter_with(oracle: Arc<dyn Oracle>) -> Arc<Arbiter> {
        let collaborators = Collaborators {
            assembler: Arc::new(LenAssembler),
            ensemble: Arc::new(LengthEnsemble),
            single_label: Arc::new(FactualSingle),
            oracle,
        };
        Arc::new(
            Arbiter::new(
                collaborators,
                LabelMap::roberta_default(),
                &ArbiterConfig::default(),
            )
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn responses_follow_input_order() {
        let lines = vec![
            r#"{"text":"Who is the CEO?"}"#.to_string(),
            r#"{"text":"List the founders and then describe their roles","type":"x"}"#.to_string(),
            r#"{"text":"Who is the CEO?","type":"Ensemble"}"#.to_string(),
            r#"{"text":"anything","type":"Chatgpt"}"#.to_string(),
            r#"{"text":"anything","type":"Roberta"}"#.to_string(),
        ];
        let out = classify_lines(arbiter(), lines, 4).await;
        assert_eq!(
            out,
            vec![
                r#"{"prediction":"Factual"}"#,
                r#"{"prediction":"Multi-Part"}"#,
                r#"{"prediction":["Factual"]}"#,
                r#"{"prediction":"Reasoning/Inference"}"#,
                r#"{"prediction":"Factual"}"#,
            ]
        );
    }

    #[tokio::test]
    async fn bad_lines_become_error_responses() {
        let lines = vec![
            "not json".to_string(),
            r#"{"text":"   ","type":"Roberta"}"#.to_string(),
            r#"{"text":"Who is the CEO?","type":"Roberta"}"#.to_string(),
        ];
        let out = classify_lines(arbiter(), lines, 4).await;
        assert_eq!(out.len(), 3);

        let first: ErrorResponse = serde_json::from_str(&out[0]).unwrap();
        assert!(first.error.starts_with("invalid request"));
        let second: ErrorResponse = serde_json::from_str(&out[1]).unwrap();
        assert_eq!(second.error, "query text is empty");
        assert_eq!(out[2], r#"{"prediction":"Factual"}"#);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrency_is_bounded() {
        let oracle = Arc::new(SlowOracle::default());
        let lines: Vec<String> = (0..8)
            .map(|i| format!(r#"{{"text":"query {i}","type":"Chatgpt"}}"#))
            .collect();

        let out = classify_lines(arbiter_with(oracle.clone()), lines, 2).await;
        assert_eq!(out.len(), 8);
        assert!(out.iter().all(|l| l == r#"{"prediction":"Factual"}"#));
        let peak = oracle.peak.load(Ordering::SeqCst);
        assert!((1..=2).contains(&peak), "peak in-flight {peak}");
    }

    #[tokio::test]
    async fn zero_concurrency_still_makes_progress() {
        let lines = vec![r#"{"text":"Who is the CEO?","type":"Roberta"}"#.to_string()];
        let out = classify_lines(arbiter(), lines, 0).await;
        assert_eq!(out, vec![r#"{"prediction":"Factual"}"#]);
    }
}
