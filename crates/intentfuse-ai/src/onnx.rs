//! ONNX Runtime plumbing shared by the embedder and the sequence classifier.
//!
//! Both models take one tokenized query as `[1, seq]` tensors and are read
//! back through their first output.

use std::path::{Path, PathBuf};

use ort::session::Session;
use ort::value::{Tensor, ValueType};
use tokenizers::Tokenizer;

/// `model.onnx` and `tokenizer.json` inside a HuggingFace export directory.
pub(crate) fn model_files(model_dir: &Path) -> anyhow::Result<(PathBuf, PathBuf)> {
    let model_path = model_dir.join("model.onnx");
    let tokenizer_path = model_dir.join("tokenizer.json");
    anyhow::ensure!(model_path.exists(), "model.onnx not found in {model_dir:?}");
    anyhow::ensure!(
        tokenizer_path.exists(),
        "tokenizer.json not found in {model_dir:?}"
    );
    Ok((model_path, tokenizer_path))
}

/// Load a tokenizer that truncates at `max_length` tokens. No padding: one
/// query per run.
pub(crate) fn load_tokenizer(path: &Path, max_length: usize) -> anyhow::Result<Tokenizer> {
    let mut tokenizer =
        Tokenizer::from_file(path).map_err(|e| anyhow::anyhow!("load tokenizer: {e}"))?;
    tokenizer
        .with_truncation(Some(tokenizers::TruncationParams {
            max_length,
            ..Default::default()
        }))
        .map_err(|e| anyhow::anyhow!("set truncation: {e}"))?;
    tokenizer.with_padding(None);
    Ok(tokenizer)
}

pub(crate) fn accepts_token_type_ids(session: &Session) -> bool {
    session
        .inputs()
        .iter()
        .any(|input| input.name() == "token_type_ids")
}

/// One encoded query.
pub(crate) struct Encoded {
    pub ids: Vec<i64>,
    pub mask: Vec<i64>,
    pub type_ids: Vec<i64>,
}

impl Encoded {
    pub fn new(tokenizer: &Tokenizer, text: &str) -> anyhow::Result<Self> {
        let encoding = tokenizer
            .encode(text, true)
            .map_err(|e| anyhow::anyhow!("tokenize: {e}"))?;
        let widen = |xs: &[u32]| xs.iter().map(|&x| i64::from(x)).collect::<Vec<_>>();
        Ok(Self {
            ids: widen(encoding.get_ids()),
            mask: widen(encoding.get_attention_mask()),
            type_ids: widen(encoding.get_type_ids()),
        })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Run `session` on this query and copy out its first output as
    /// `(shape, data)`.
    pub fn run(
        &self,
        session: &mut Session,
        with_type_ids: bool,
    ) -> anyhow::Result<(Vec<i64>, Vec<f32>)> {
        let shape = [1i64, self.len() as i64];
        let ids = Tensor::from_array((shape, self.ids.clone().into_boxed_slice()))?;
        let mask = Tensor::from_array((shape, self.mask.clone().into_boxed_slice()))?;

        // RoBERTa exports have no token_type_ids input; BERT exports require it.
        let outputs = if with_type_ids {
            let types = Tensor::from_array((shape, self.type_ids.clone().into_boxed_slice()))?;
            session.run(ort::inputs![
                "input_ids" => ids,
                "attention_mask" => mask,
                "token_type_ids" => types,
            ])?
        } else {
            session.run(ort::inputs![
                "input_ids" => ids,
                "attention_mask" => mask,
            ])?
        };

        let (out_shape, data) = outputs[0].try_extract_tensor::<f32>()?;
        let dims: &[i64] = out_shape;
        Ok((dims.to_vec(), data.to_vec()))
    }
}

/// Last dimension of an ONNX tensor output, if it is static.
pub(crate) fn infer_last_dim(output_type: &ValueType) -> Option<usize> {
    match output_type {
        ValueType::Tensor { shape, .. } => shape
            .last()
            .and_then(|&d| if d > 0 { Some(d as usize) } else { None }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_model_files_are_named() {
        let dir = tempfile::tempdir().unwrap();
        let err = model_files(dir.path()).unwrap_err();
        assert!(err.to_string().contains("model.onnx not found"));

        std::fs::write(dir.path().join("model.onnx"), b"").unwrap();
        let err = model_files(dir.path()).unwrap_err();
        assert!(err.to_string().contains("tokenizer.json not found"));

        std::fs::write(dir.path().join("tokenizer.json"), b"{}").unwrap();
        let (model, tokenizer) = model_files(dir.path()).unwrap();
        assert!(model.ends_with("model.onnx"));
        assert!(tokenizer.ends_with("tokenizer.json"));
    }
}
