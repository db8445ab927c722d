//! Inference collaborators: ONNX Runtime embeddings and sequence classification,
//! heuristic query features, and the linear ensemble classifier.

mod assembler;
mod heuristics;
mod linear;
mod softmax;

pub use assembler::{EmbeddingAssembler, TextEmbedder};
pub use heuristics::{AUX_DIM, AuxFeatures};
pub use linear::LinearClassifier;

#[cfg(feature = "onnx")]
mod embedder;
#[cfg(feature = "onnx")]
mod onnx;
#[cfg(feature = "onnx")]
mod sequence;
#[cfg(feature = "onnx")]
pub use embedder::Embedder;
#[cfg(feature = "onnx")]
pub use sequence::SequenceClassifier;
