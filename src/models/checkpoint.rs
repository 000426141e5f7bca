//! Checkpoint manifest of an exported im2latex model.
//!
//! A checkpoint is a JSON file holding the training-time arguments and the
//! locations of two ONNX graphs, the image encoder and the single-step decoder.
//! Graph paths are resolved relative to the manifest's directory.
//!
//! ```json
//! {
//!   "args": { "emb_dim": 80, "dec_rnn_h": 512, "add_position_features": false, "dropout": 0.0 },
//!   "encoder": "encoder.onnx",
//!   "decoder_step": "decoder_step.onnx"
//! }
//! ```

use crate::core::config::{ConfigError, ConfigValidator};
use crate::core::errors::{EvalError, EvalResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Training-time configuration stored with the weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArgs {
    /// Token embedding dimension.
    #[serde(default = "ModelArgs::default_emb_dim")]
    pub emb_dim: usize,
    /// Decoder RNN hidden size.
    #[serde(default = "ModelArgs::default_dec_rnn_h")]
    pub dec_rnn_h: usize,
    /// Whether positional features were added to the encoder output.
    #[serde(default)]
    pub add_position_features: bool,
    /// Dropout rate used in training.
    #[serde(default)]
    pub dropout: f32,
    /// Vocabulary size the model was trained with, if recorded.
    #[serde(default)]
    pub vocab_size: Option<usize>,
}

impl ModelArgs {
    fn default_emb_dim() -> usize {
        80
    }

    fn default_dec_rnn_h() -> usize {
        512
    }
}

impl Default for ModelArgs {
    fn default() -> Self {
        Self {
            emb_dim: Self::default_emb_dim(),
            dec_rnn_h: Self::default_dec_rnn_h(),
            add_position_features: false,
            dropout: 0.0,
            vocab_size: None,
        }
    }
}

impl ConfigValidator for ModelArgs {
    fn validate(&self) -> Result<(), ConfigError> {
        self.validate_positive_usize(self.emb_dim, "emb_dim")?;
        self.validate_positive_usize(self.dec_rnn_h, "dec_rnn_h")?;
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(ConfigError::InvalidConfig {
                message: format!("dropout must be in [0, 1), got {}", self.dropout),
            });
        }
        if let Some(size) = self.vocab_size {
            self.validate_positive_usize(size, "vocab_size")?;
        }
        Ok(())
    }
}

/// Tensor names used by the exported graphs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNames {
    /// Encoder input (`[1, 1, H, W]` image).
    #[serde(default = "GraphNames::default_image")]
    pub image: String,
    /// Decoder-step input holding the encoded image.
    #[serde(default = "GraphNames::default_features")]
    pub features: String,
    /// Decoder-step input holding the token prefixes.
    #[serde(default = "GraphNames::default_tokens")]
    pub tokens: String,
    /// Decoder-step output; the first graph output when unset.
    #[serde(default)]
    pub probs: Option<String>,
}

impl GraphNames {
    fn default_image() -> String {
        "image".to_string()
    }

    fn default_features() -> String {
        "features".to_string()
    }

    fn default_tokens() -> String {
        "tokens".to_string()
    }
}

impl Default for GraphNames {
    fn default() -> Self {
        Self {
            image: Self::default_image(),
            features: Self::default_features(),
            tokens: Self::default_tokens(),
            probs: None,
        }
    }
}

/// Parsed checkpoint manifest with graph paths resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelCheckpoint {
    #[serde(default)]
    pub args: ModelArgs,
    /// Image encoder graph.
    pub encoder: PathBuf,
    /// Single-step decoder graph.
    pub decoder_step: PathBuf,
    #[serde(default)]
    pub names: GraphNames,
}

impl ModelCheckpoint {
    /// Loads a manifest and resolves its graph paths.
    ///
    /// # Errors
    ///
    /// Returns `EvalError::ConfigError` when the manifest is missing, malformed or
    /// carries invalid arguments, and `EvalError::ModelLoad` when a referenced graph
    /// does not exist.
    pub fn load(path: &Path) -> EvalResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            EvalError::config_error(format!(
                "failed to read checkpoint '{}': {}",
                path.display(),
                e
            ))
        })?;
        let mut checkpoint: Self = serde_json::from_str(&content).map_err(|e| {
            EvalError::config_error(format!(
                "malformed checkpoint '{}': {}",
                path.display(),
                e
            ))
        })?;
        checkpoint.args.validate()?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        checkpoint.encoder = base.join(&checkpoint.encoder);
        checkpoint.decoder_step = base.join(&checkpoint.decoder_step);
        for graph in [&checkpoint.encoder, &checkpoint.decoder_step] {
            if let Err(e) = checkpoint.args.validate_file_path(graph) {
                return Err(EvalError::model_load_error(
                    graph,
                    "graph referenced by checkpoint is not a readable file",
                    Some("export the encoder and decoder-step graphs next to the manifest"),
                    Some(e),
                ));
            }
        }

        tracing::info!(
            "Checkpoint {}: emb_dim={}, dec_rnn_h={}, position_features={}, dropout={}",
            path.display(),
            checkpoint.args.emb_dim,
            checkpoint.args.dec_rnn_h,
            checkpoint.args.add_position_features,
            checkpoint.args.dropout
        );
        Ok(checkpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_graphs(dir: &Path) {
        fs::write(dir.join("encoder.onnx"), b"").unwrap();
        fs::write(dir.join("decoder_step.onnx"), b"").unwrap();
    }

    #[test]
    fn test_load_resolves_relative_graphs() {
        let dir = tempdir().unwrap();
        write_graphs(dir.path());
        let manifest = dir.path().join("ckpt.json");
        fs::write(
            &manifest,
            r#"{
                "args": {"emb_dim": 64, "dec_rnn_h": 256, "add_position_features": true,
                         "dropout": 0.2, "vocab_size": 540},
                "encoder": "encoder.onnx",
                "decoder_step": "decoder_step.onnx",
                "names": {"tokens": "tgt"}
            }"#,
        )
        .unwrap();

        let ckpt = ModelCheckpoint::load(&manifest).unwrap();
        assert_eq!(ckpt.args.emb_dim, 64);
        assert!(ckpt.args.add_position_features);
        assert_eq!(ckpt.args.vocab_size, Some(540));
        assert_eq!(ckpt.encoder, dir.path().join("encoder.onnx"));
        assert_eq!(ckpt.names.tokens, "tgt");
        assert_eq!(ckpt.names.features, "features");
    }

    #[test]
    fn test_defaults_fill_missing_args() {
        let dir = tempdir().unwrap();
        write_graphs(dir.path());
        let manifest = dir.path().join("ckpt.json");
        fs::write(
            &manifest,
            r#"{"encoder": "encoder.onnx", "decoder_step": "decoder_step.onnx"}"#,
        )
        .unwrap();

        let ckpt = ModelCheckpoint::load(&manifest).unwrap();
        assert_eq!(ckpt.args, ModelArgs::default());
    }

    #[test]
    fn test_missing_manifest_is_config_error() {
        let result = ModelCheckpoint::load(Path::new("/nonexistent/ckpt.json"));
        assert!(matches!(result, Err(EvalError::ConfigError { .. })));
    }

    #[test]
    fn test_malformed_manifest_is_config_error() {
        let dir = tempdir().unwrap();
        let manifest = dir.path().join("ckpt.json");
        fs::write(&manifest, "{ not json").unwrap();
        let err = ModelCheckpoint::load(&manifest).unwrap_err();
        assert!(err.to_string().contains("malformed checkpoint"));
    }

    #[test]
    fn test_missing_graph_is_model_load_error() {
        let dir = tempdir().unwrap();
        let manifest = dir.path().join("ckpt.json");
        fs::write(
            &manifest,
            r#"{"encoder": "encoder.onnx", "decoder_step": "decoder_step.onnx"}"#,
        )
        .unwrap();
        let result = ModelCheckpoint::load(&manifest);
        assert!(matches!(result, Err(EvalError::ModelLoad { .. })));
        let source = std::error::Error::source(&result.unwrap_err())
            .map(|e| e.to_string())
            .unwrap_or_default();
        assert!(source.contains("path does not exist"));
    }

    #[test]
    fn test_graph_path_naming_a_directory_is_rejected() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("encoder.onnx")).unwrap();
        fs::write(dir.path().join("decoder_step.onnx"), b"").unwrap();
        let manifest = dir.path().join("ckpt.json");
        fs::write(
            &manifest,
            r#"{"encoder": "encoder.onnx", "decoder_step": "decoder_step.onnx"}"#,
        )
        .unwrap();
        let err = ModelCheckpoint::load(&manifest).unwrap_err();
        assert!(matches!(err, EvalError::ModelLoad { .. }));
        let source = std::error::Error::source(&err)
            .map(|e| e.to_string())
            .unwrap_or_default();
        assert!(source.contains("not a file"));
    }

    #[test]
    fn test_invalid_dropout_rejected() {
        let args = ModelArgs {
            dropout: 1.5,
            ..ModelArgs::default()
        };
        assert!(args.validate().is_err());
    }
}
