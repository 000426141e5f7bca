use super::*;
use ndarray::{Array2, ArrayD, ArrayView2, ArrayViewD, Axis, IxDyn};
use ort::value::TensorRef;

impl OrtInfer {
    /// Returns the configured or discovered output tensor name.
    fn get_output_name(&self) -> EvalResult<String> {
        if let Some(ref name) = self.output_name {
            return Ok(name.clone());
        }
        let session = self.sessions[0].lock().map_err(|_| EvalError::InvalidInput {
            message: "Failed to acquire session lock".to_string(),
        })?;
        session
            .outputs
            .first()
            .map(|output| output.name.clone())
            .ok_or_else(|| EvalError::InvalidInput {
                message: format!(
                    "Model '{}' declares no outputs - the graph may be invalid or corrupted",
                    self.model_name
                ),
            })
    }

    /// Runs a single-input graph and returns its first (or configured) output.
    pub fn infer_dyn(&self, input_name: &str, x: ArrayViewD<'_, f32>) -> EvalResult<ArrayD<f32>> {
        let input_shape = x.shape().to_vec();
        let output_name = self.get_output_name()?;

        let input_tensor = TensorRef::from_array_view(x).map_err(|e| {
            EvalError::inference_error(
                &self.model_name,
                &format!(
                    "Failed to convert input tensor with shape {:?}",
                    input_shape
                ),
                e,
            )
        })?;

        self.with_session(|session| {
            let outputs = session
                .run(ort::inputs![input_name => input_tensor])
                .map_err(|e| {
                    EvalError::inference_error(
                        &self.model_name,
                        &format!(
                            "ONNX Runtime inference failed with input '{}' {:?} -> output '{}'",
                            input_name, input_shape, output_name
                        ),
                        e,
                    )
                })?;

            let (shape, data) = outputs[output_name.as_str()]
                .try_extract_tensor::<f32>()
                .map_err(|e| {
                    EvalError::inference_error(
                        &self.model_name,
                        &format!("Failed to extract output tensor '{}' as f32", output_name),
                        e,
                    )
                })?;
            let dims: Vec<usize> = shape.iter().map(|&d| d.max(0) as usize).collect();
            Ok(ArrayD::from_shape_vec(IxDyn(&dims), data.to_vec())?)
        })
    }

    /// Runs a decoder-step graph taking image features and token prefixes.
    ///
    /// The output must be `[n, vocab]`, or `[n, t, vocab]` in which case the last
    /// position is returned.
    pub fn infer_next_token(
        &self,
        features_name: &str,
        features: ArrayViewD<'_, f32>,
        tokens_name: &str,
        tokens: ArrayView2<'_, i64>,
    ) -> EvalResult<Array2<f32>> {
        let batch = tokens.nrows();
        let output_name = self.get_output_name()?;

        let features_tensor = TensorRef::from_array_view(features).map_err(|e| {
            EvalError::inference_error(&self.model_name, "Failed to convert feature tensor", e)
        })?;
        let tokens_tensor = TensorRef::from_array_view(tokens).map_err(|e| {
            EvalError::inference_error(&self.model_name, "Failed to convert token tensor", e)
        })?;

        self.with_session(|session| {
            let outputs = session
                .run(ort::inputs![
                    features_name => features_tensor,
                    tokens_name => tokens_tensor
                ])
                .map_err(|e| {
                    EvalError::inference_error(
                        &self.model_name,
                        &format!(
                            "ONNX Runtime decode step failed for {} prefixes -> output '{}'",
                            batch, output_name
                        ),
                        e,
                    )
                })?;

            let (shape, data) = outputs[output_name.as_str()]
                .try_extract_tensor::<f32>()
                .map_err(|e| {
                    EvalError::inference_error(
                        &self.model_name,
                        &format!("Failed to extract output tensor '{}' as f32", output_name),
                        e,
                    )
                })?;
            let dims: Vec<usize> = shape.iter().map(|&d| d.max(0) as usize).collect();
            let output = ArrayD::from_shape_vec(IxDyn(&dims), data.to_vec())?;
            last_position(output, batch, &self.model_name)
        })
    }
}

/// Reduces a `[n, vocab]` or `[n, t, vocab]` output to `[n, vocab]`.
fn last_position(output: ArrayD<f32>, batch: usize, model_name: &str) -> EvalResult<Array2<f32>> {
    let shape = output.shape().to_vec();
    let reduced = match shape.len() {
        2 => output,
        3 if shape[1] > 0 => output.index_axis(Axis(1), shape[1] - 1).to_owned(),
        _ => {
            return Err(EvalError::InvalidInput {
                message: format!(
                    "Model '{}' produced output of shape {:?}; expected [n, vocab] or [n, t, vocab]",
                    model_name, shape
                ),
            });
        }
    };
    let reduced = reduced.into_dimensionality::<ndarray::Ix2>()?;
    if reduced.nrows() != batch {
        return Err(EvalError::InvalidInput {
            message: format!(
                "Model '{}' returned {} rows for {} prefixes",
                model_name,
                reduced.nrows(),
                batch
            ),
        });
    }
    Ok(reduced)
}
