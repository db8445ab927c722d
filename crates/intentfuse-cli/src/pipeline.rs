//! Loads the collaborators and wires them into an [`Arbiter`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Args;
use intentfuse_ai::{Embedder, EmbeddingAssembler, LinearClassifier, SequenceClassifier};
use intentfuse_core::{Arbiter, ArbiterConfig, Collaborators, FeatureAssembler, Label, LabelMap};
use intentfuse_oracle::{ChatOracle, OracleConfig};
use tracing::info;

#[derive(Args)]
pub struct ModelArgs {
    /// Sentence-embedding model directory (model.onnx + tokenizer.json).
    #[arg(
        long,
        global = true,
        env = "INTENTFUSE_EMBEDDER_DIR",
        default_value = "models/all-MiniLM-L6-v2"
    )]
    pub embedder_dir: PathBuf,

    /// Linear ensemble export (JSON with classes, coef, intercept).
    #[arg(
        long,
        global = true,
        env = "INTENTFUSE_ENSEMBLE_MODEL",
        default_value = "models/ensemble.json"
    )]
    pub ensemble_model: PathBuf,

    /// Fine-tuned sequence-classification model directory.
    #[arg(
        long,
        global = true,
        env = "INTENTFUSE_CLASSIFIER_DIR",
        default_value = "models/intent-roberta"
    )]
    pub classifier_dir: PathBuf,

    /// JSON object mapping the classifier's native tokens to labels.
    /// Defaults to LABEL_0..LABEL_4 in canonical order.
    #[arg(long, global = true, env = "INTENTFUSE_LABEL_MAP")]
    pub label_map: Option<PathBuf>,
}

#[derive(Args)]
pub struct OracleArgs {
    /// Base URL of an OpenAI-compatible chat-completions API.
    #[arg(
        long,
        global = true,
        env = "INTENTFUSE_ORACLE_URL",
        default_value = "https://api.openai.com"
    )]
    pub oracle_url: String,

    #[arg(
        long,
        global = true,
        env = "INTENTFUSE_ORACLE_MODEL",
        default_value = "gpt-4o-mini"
    )]
    pub oracle_model: String,

    #[arg(long, global = true, env = "INTENTFUSE_ORACLE_API_KEY", hide_env_values = true)]
    pub oracle_api_key: Option<String>,

    /// Per-request timeout in seconds.
    #[arg(
        long,
        global = true,
        env = "INTENTFUSE_ORACLE_TIMEOUT_SECS",
        default_value_t = 30
    )]
    pub oracle_timeout_secs: u64,
}

pub fn build_arbiter(
    models: &ModelArgs,
    oracle: &OracleArgs,
    config: &ArbiterConfig,
) -> anyhow::Result<Arbiter> {
    config.validate()?;
    let start = Instant::now();

    let embedder = Embedder::load(&models.embedder_dir).context("loading embedding model")?;
    let assembler = EmbeddingAssembler::new(embedder);

    let ensemble =
        LinearClassifier::load(&models.ensemble_model).context("loading ensemble model")?;
    anyhow::ensure!(
        ensemble.n_features() == assembler.dim(),
        "ensemble expects {} features but the assembler produces {}",
        ensemble.n_features(),
        assembler.dim()
    );

    let single_label =
        SequenceClassifier::load(&models.classifier_dir).context("loading sequence classifier")?;

    let labels = match &models.label_map {
        Some(path) => load_label_map(path)?,
        None => LabelMap::roberta_default(),
    };
    check_label_agreement(ensemble.classes(), &labels)?;

    let chat = ChatOracle::new(OracleConfig {
        base_url: oracle.oracle_url.clone(),
        model: oracle.oracle_model.clone(),
        api_key: oracle.oracle_api_key.clone(),
        timeout: Duration::from_secs(oracle.oracle_timeout_secs),
    })?;

    let collaborators = Collaborators {
        assembler: Arc::new(assembler),
        ensemble: Arc::new(ensemble),
        single_label: Arc::new(single_label),
        oracle: Arc::new(chat),
    };
    let arbiter = Arbiter::new(collaborators, labels, config)?;
    info!(
        elapsed_ms = start.elapsed().as_millis() as u64,
        prob_diff_threshold = arbiter.resolver().prob_diff_threshold(),
        uncertainty_threshold = arbiter.resolver().uncertainty_threshold(),
        "arbiter ready"
    );
    Ok(arbiter)
}

/// Both classifiers must speak the canonical taxonomy, and every label the
/// single-label model can produce must be one the ensemble can rank.
/// Otherwise arbitration can never agree and every query escalates.
pub fn check_label_agreement(
    ensemble_classes: &[Label],
    labels: &LabelMap,
) -> anyhow::Result<()> {
    for class in ensemble_classes {
        anyhow::ensure!(
            class.is_canonical(),
            "ensemble class \"{class}\" is not a canonical label"
        );
    }
    for target in labels.targets() {
        anyhow::ensure!(
            target.is_canonical(),
            "label map target \"{target}\" is not a canonical label"
        );
        anyhow::ensure!(
            ensemble_classes.contains(target),
            "label map target {target} is not among the ensemble's classes"
        );
    }
    Ok(())
}

/// Read a `{ "native_token": "Canonical Label" }` table.
pub fn load_label_map(path: &Path) -> anyhow::Result<LabelMap> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading label map {}", path.display()))?;
    let table: HashMap<String, String> = serde_json::from_str(&raw)
        .with_context(|| format!("parsing label map {}", path.display()))?;
    anyhow::ensure!(!table.is_empty(), "label map {} is empty", path.display());
    Ok(LabelMap::from_pairs(table))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn label_map_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "LABEL_0": "Factual", "LABEL_1": "Multi-Part" }}"#).unwrap();

        let map = load_label_map(file.path()).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.canonicalize("LABEL_1").unwrap(), "Multi-Part");
        assert!(map.canonicalize("LABEL_2").is_err());
    }

    #[test]
    fn empty_label_map_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{}}").unwrap();
        assert!(load_label_map(file.path()).is_err());
    }

    fn ensemble_export(classes: &str) -> LinearClassifier {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "classes": {classes}, "coef": [[1.0], [0.0]], "intercept": [0.0, 0.0] }}"#
        )
        .unwrap();
        LinearClassifier::load(file.path()).unwrap()
    }

    #[test]
    fn canonical_ensemble_and_map_agree() {
        let ensemble = ensemble_export(r#"["Factual", "Multi-Part"]"#);
        let map = LabelMap::from_pairs([("LABEL_0", "Factual"), ("LABEL_1", "Multi-Part")]);
        check_label_agreement(ensemble.classes(), &map).unwrap();
    }

    #[test]
    fn lowercase_ensemble_classes_are_rejected() {
        let ensemble = ensemble_export(r#"["factual", "multi-part"]"#);
        let map = LabelMap::from_pairs([("LABEL_0", "Factual")]);
        let err = check_label_agreement(ensemble.classes(), &map).unwrap_err();
        assert!(err.to_string().contains("\"factual\" is not a canonical label"));
    }

    #[test]
    fn label_map_outside_ensemble_is_rejected() {
        let ensemble = ensemble_export(r#"["Factual", "Multi-Part"]"#);
        let err = check_label_agreement(ensemble.classes(), &LabelMap::roberta_default())
            .unwrap_err();
        assert!(err.to_string().contains("is not among the ensemble's classes"));

        let map = LabelMap::from_pairs([("LABEL_0", "fact")]);
        let err = check_label_agreement(ensemble.classes(), &map).unwrap_err();
        assert!(err.to_string().contains("label map target"));
    }

    #[test]
    fn invalid_config_fails_before_loading_models() {
        let models = ModelArgs {
            embedder_dir: "/nonexistent".into(),
            ensemble_model: "/nonexistent.json".into(),
            classifier_dir: "/nonexistent".into(),
            label_map: None,
        };
        let oracle = OracleArgs {
            oracle_url: "http://localhost".into(),
            oracle_model: "m".into(),
            oracle_api_key: None,
            oracle_timeout_secs: 1,
        };
        let config = ArbiterConfig {
            prob_diff_threshold: -1.0,
            ..Default::default()
        };
        let err = build_arbiter(&models, &oracle, &config)
            .err()
            .expect("build_arbiter should reject the config");
        assert!(err.to_string().contains("prob_diff_threshold"));
    }
}
