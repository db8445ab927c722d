//! Fine-tuned transformer sequence classifier (the single-label model).
//!
//! Expects a directory exported from a HuggingFace sequence-classification
//! model: `model.onnx`, `tokenizer.json` and optionally `config.json`. The
//! emitted token is taken from `config.json`'s `id2label`, which for most
//! fine-tunes is the generic `LABEL_i`; the arbiter maps it to a canonical
//! label. Without a config, tokens default to `LABEL_i`.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use anyhow::Context;
use intentfuse_core::{NativeVerdict, SingleLabelClassifier};
use ort::session::Session;
use serde::Deserialize;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use crate::onnx::{self, Encoded};
use crate::softmax::{argmax, softmax};

const MAX_TOKENS: usize = 512;

#[derive(Deserialize)]
struct ModelConfig {
    #[serde(default)]
    id2label: HashMap<String, String>,
}

pub struct SequenceClassifier {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    id2label: Vec<String>,
    with_type_ids: bool,
}

impl SequenceClassifier {
    pub fn load(model_dir: &Path) -> anyhow::Result<Self> {
        let (model_path, tokenizer_path) = onnx::model_files(model_dir)?;

        let session = Session::builder()?.commit_from_file(&model_path)?;
        let with_type_ids = onnx::accepts_token_type_ids(&session);
        let n_labels = onnx::infer_last_dim(session.outputs()[0].dtype());

        let id2label = match read_id2label(&model_dir.join("config.json"))? {
            Some(labels) => labels,
            None => {
                let n = n_labels.context("no config.json and the logits width is symbolic")?;
                (0..n).map(|i| format!("LABEL_{i}")).collect()
            }
        };
        if let Some(n) = n_labels {
            anyhow::ensure!(
                n == id2label.len(),
                "model emits {n} logits but config.json names {} labels",
                id2label.len()
            );
        }

        let tokenizer = onnx::load_tokenizer(&tokenizer_path, MAX_TOKENS)?;

        info!(
            labels = id2label.len(),
            with_type_ids,
            model = %model_path.display(),
            "loaded sequence classifier"
        );
        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            id2label,
            with_type_ids,
        })
    }

    /// Native tokens in logit order.
    pub fn labels(&self) -> &[String] {
        &self.id2label
    }

    fn logits(&self, text: &str) -> anyhow::Result<Vec<f64>> {
        let encoded = Encoded::new(&self.tokenizer, text)?;
        let (dims, data) = {
            let mut session = self
                .session
                .lock()
                .map_err(|_| anyhow::anyhow!("session mutex poisoned"))?;
            encoded.run(&mut session, self.with_type_ids)?
        };

        // Logits: [1, n_labels].
        anyhow::ensure!(
            dims.len() == 2 && dims[0] == 1 && dims[1] as usize == self.id2label.len(),
            "unexpected logits shape: {dims:?}, expected [1, {}]",
            self.id2label.len()
        );
        Ok(data.iter().map(|&x| f64::from(x)).collect())
    }
}

impl SingleLabelClassifier for SequenceClassifier {
    fn classify(&self, text: &str) -> anyhow::Result<NativeVerdict> {
        let logits = self.logits(text)?;
        let probs = softmax(&logits);
        let idx = argmax(&probs).context("classifier produced no logits")?;
        let token = self.id2label[idx].clone();
        debug!(token = %token, confidence = probs[idx], "sequence classifier verdict");
        Ok(NativeVerdict {
            token,
            confidence: probs[idx] as f32,
        })
    }
}

/// Read `id2label` from a HuggingFace `config.json`, ordered by id.
///
/// Returns `None` if the file is absent or has no mapping.
fn read_id2label(path: &Path) -> anyhow::Result<Option<Vec<String>>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let config: ModelConfig =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
    if config.id2label.is_empty() {
        return Ok(None);
    }

    let mut pairs = config
        .id2label
        .into_iter()
        .map(|(id, label)| {
            id.parse::<usize>()
                .map(|id| (id, label))
                .with_context(|| format!("non-numeric id2label key {id:?}"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    pairs.sort_by_key(|(id, _)| *id);

    for (expected, (id, _)) in pairs.iter().enumerate() {
        anyhow::ensure!(*id == expected, "id2label is missing id {expected}");
    }
    Ok(Some(pairs.into_iter().map(|(_, label)| label).collect()))
}
