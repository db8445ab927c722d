//! Query embeddings from a sentence-transformers ONNX export
//! (all-MiniLM-L6-v2 by default).
//!
//! One query per call: the hidden states of its tokens are mean-pooled over
//! the attention mask and L2-normalized.

use std::path::Path;

use ort::session::Session;
use tokenizers::Tokenizer;
use tracing::info;

use crate::assembler::TextEmbedder;
use crate::onnx::{self, Encoded};

/// MiniLM's hidden width, used when the export leaves it symbolic.
const DEFAULT_DIM: usize = 384;

/// MiniLM was trained on sequences of at most 256 tokens.
const MAX_TOKENS: usize = 256;

pub struct Embedder {
    session: Session,
    tokenizer: Tokenizer,
    dim: usize,
    with_type_ids: bool,
}

impl Embedder {
    /// Load from a directory containing `model.onnx` and `tokenizer.json`.
    pub fn load(model_dir: &Path) -> anyhow::Result<Self> {
        let (model_path, tokenizer_path) = onnx::model_files(model_dir)?;

        let session = Session::builder()?.commit_from_file(&model_path)?;
        let dim = onnx::infer_last_dim(session.outputs()[0].dtype()).unwrap_or(DEFAULT_DIM);
        let with_type_ids = onnx::accepts_token_type_ids(&session);
        let tokenizer = onnx::load_tokenizer(&tokenizer_path, MAX_TOKENS)?;

        info!(dim, model = %model_path.display(), "loaded embedding model");
        Ok(Self {
            session,
            tokenizer,
            dim,
            with_type_ids,
        })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn embed(&mut self, text: &str) -> anyhow::Result<Vec<f32>> {
        let encoded = Encoded::new(&self.tokenizer, text)?;
        let (dims, hidden) = encoded.run(&mut self.session, self.with_type_ids)?;

        // Token hidden states: [1, seq, dim].
        anyhow::ensure!(
            dims.len() == 3
                && dims[0] == 1
                && dims[1] as usize == encoded.len()
                && dims[2] as usize == self.dim,
            "unexpected output shape {dims:?}, expected [1, {}, {}]",
            encoded.len(),
            self.dim
        );

        let mut pooled = mean_pool(&hidden, &encoded.mask, self.dim);
        normalize(&mut pooled);
        Ok(pooled)
    }
}

impl TextEmbedder for Embedder {
    fn embed(&mut self, text: &str) -> anyhow::Result<Vec<f32>> {
        Embedder::embed(self, text)
    }

    fn dim(&self) -> usize {
        self.dim
    }
}

/// Average the rows of `hidden` (one per token) whose mask is set.
fn mean_pool(hidden: &[f32], mask: &[i64], dim: usize) -> Vec<f32> {
    let mut pooled = vec![0.0f32; dim];
    let mut kept = 0usize;
    for (row, _) in hidden.chunks_exact(dim).zip(mask).filter(|(_, m)| **m > 0) {
        for (acc, x) in pooled.iter_mut().zip(row) {
            *acc += x;
        }
        kept += 1;
    }
    if kept > 0 {
        let n = kept as f32;
        pooled.iter_mut().for_each(|x| *x /= n);
    }
    pooled
}

fn normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn model_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("../../models/all-MiniLM-L6-v2")
    }

    #[test]
    fn mean_pool_skips_masked_tokens() {
        let hidden = [1.0, 2.0, 3.0, 4.0, 100.0, 100.0];
        let pooled = mean_pool(&hidden, &[1, 1, 0], 2);
        assert_eq!(pooled, vec![2.0, 3.0]);
    }

    #[test]
    fn mean_pool_with_nothing_unmasked_is_zero() {
        assert_eq!(mean_pool(&[5.0, 5.0], &[0], 2), vec![0.0, 0.0]);
    }

    #[test]
    fn normalize_gives_unit_length() {
        let mut v = vec![3.0, 4.0];
        normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);

        let mut zero = vec![0.0, 0.0];
        normalize(&mut zero);
        assert_eq!(zero, vec![0.0, 0.0]);
    }

    #[test]
    #[ignore = "requires models/all-MiniLM-L6-v2"]
    fn embeds_query_to_unit_vector() {
        let mut embedder = Embedder::load(&model_dir()).unwrap();
        assert_eq!(embedder.dim(), 384);

        let v = embedder.embed("How many tickets were closed per week?").unwrap();
        assert_eq!(v.len(), 384);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4, "expected unit norm, got {norm}");
    }

    #[test]
    #[ignore = "requires models/all-MiniLM-L6-v2"]
    fn similar_intents_are_closer() {
        let mut embedder = Embedder::load(&model_dir()).unwrap();
        let avg = embedder.embed("average sales per month").unwrap();
        let total = embedder.embed("total revenue per quarter").unwrap();
        let why = embedder.embed("why did the project fail").unwrap();

        let dot = |a: &[f32], b: &[f32]| -> f32 { a.iter().zip(b).map(|(x, y)| x * y).sum() };
        assert!(dot(&avg, &total) > dot(&avg, &why));
    }
}
