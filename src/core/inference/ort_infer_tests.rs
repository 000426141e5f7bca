use super::*;
use crate::core::config::OrtSessionConfig;

#[test]
fn test_missing_model_is_model_load_error() {
    let result = OrtInfer::from_config(&OrtSessionConfig::default(), "dummy_path.onnx", None);
    assert!(matches!(result, Err(EvalError::ModelLoad { .. })));
}

#[test]
fn test_from_config_with_pool_checks_path_first() {
    let config = OrtSessionConfig::new().with_session_pool_size(3);
    let result = OrtInfer::from_config(&config, "missing/decoder_step.onnx", Some("probs"));
    assert!(result.is_err());
}
