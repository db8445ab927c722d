//! Feature assembly: sentence embedding followed by the heuristic features.

use std::sync::Mutex;

use intentfuse_core::FeatureAssembler;

use crate::heuristics::{AUX_DIM, AuxFeatures};

/// A source of fixed-width sentence embeddings.
///
/// Takes `&mut self` because inference sessions need exclusive access while
/// running; [`EmbeddingAssembler`] serialises calls behind a mutex.
pub trait TextEmbedder: Send {
    fn embed(&mut self, text: &str) -> anyhow::Result<Vec<f32>>;

    fn dim(&self) -> usize;
}

/// Builds the ensemble's input vector: `embedding ++ aux_features`.
pub struct EmbeddingAssembler<E> {
    embedder: Mutex<E>,
    embed_dim: usize,
}

impl<E: TextEmbedder> EmbeddingAssembler<E> {
    pub fn new(embedder: E) -> Self {
        let embed_dim = embedder.dim();
        Self {
            embedder: Mutex::new(embedder),
            embed_dim,
        }
    }
}

impl<E: TextEmbedder> FeatureAssembler for EmbeddingAssembler<E> {
    fn assemble(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        anyhow::ensure!(!text.trim().is_empty(), "query text is empty");

        let mut features = {
            let mut embedder = self
                .embedder
                .lock()
                .map_err(|_| anyhow::anyhow!("embedder mutex poisoned"))?;
            embedder.embed(text)?
        };
        anyhow::ensure!(
            features.len() == self.embed_dim,
            "embedder returned {} dims, expected {}",
            features.len(),
            self.embed_dim
        );

        features.reserve(AUX_DIM);
        features.extend_from_slice(&AuxFeatures::extract(text));
        Ok(features)
    }

    fn dim(&self) -> usize {
        self.embed_dim + AUX_DIM
    }
}
