use super::*;
use crate::core::config::{OrtExecutionProvider, OrtSessionConfig};
use ort::execution_providers::ExecutionProviderDispatch;
use ort::logging::LogLevel;
use ort::session::builder::SessionBuilder;
use std::path::Path;

impl OrtInfer {
    /// Creates a new OrtInfer instance from an [`OrtSessionConfig`], applying the
    /// session options and constructing a session pool for concurrent decoding.
    pub fn from_config(
        config: &OrtSessionConfig,
        model_path: impl AsRef<Path>,
        output_name: Option<&str>,
    ) -> EvalResult<Self> {
        let path = model_path.as_ref();
        if !path.is_file() {
            return Err(EvalError::model_load_error(
                path,
                "model file not found",
                Some("verify the checkpoint manifest points at an existing ONNX graph"),
                None::<std::io::Error>,
            ));
        }

        let pool_size = config.get_session_pool_size();
        let mut sessions = Vec::with_capacity(pool_size);
        for _ in 0..pool_size {
            let builder = Session::builder()?.with_log_level(LogLevel::Error)?;
            let builder = Self::apply_ort_config(builder, config)?;
            let session = builder.commit_from_file(path).map_err(|e| {
                EvalError::model_load_error(
                    path,
                    "failed to create ONNX session",
                    Some("check device/EP configuration and model file"),
                    Some(e),
                )
            })?;
            sessions.push(Mutex::new(session));
        }

        let model_name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown_model")
            .to_string();

        tracing::debug!(
            "Loaded '{}' with {} session(s) from {}",
            model_name,
            pool_size,
            path.display()
        );

        Ok(OrtInfer {
            sessions,
            next_idx: AtomicUsize::new(0),
            output_name: output_name.map(|s| s.to_string()),
            model_path: path.to_path_buf(),
            model_name,
        })
    }

    fn apply_ort_config(
        mut builder: SessionBuilder,
        cfg: &OrtSessionConfig,
    ) -> Result<SessionBuilder, ort::Error> {
        if let Some(intra) = cfg.intra_threads {
            builder = builder.with_intra_threads(intra)?;
        }
        if let Some(eps) = &cfg.execution_providers {
            let providers = Self::build_execution_providers(eps);
            if !providers.is_empty() {
                builder = builder.with_execution_providers(providers)?;
            }
        }
        Ok(builder)
    }

    /// Builds execution providers from configuration
    fn build_execution_providers(eps: &[OrtExecutionProvider]) -> Vec<ExecutionProviderDispatch> {
        let mut providers = Vec::new();

        for ep in eps {
            match ep {
                OrtExecutionProvider::CPU => {
                    providers
                        .push(ort::execution_providers::CPUExecutionProvider::default().build());
                }
                #[cfg(feature = "cuda")]
                OrtExecutionProvider::CUDA { device_id } => {
                    let mut cuda_provider =
                        ort::execution_providers::CUDAExecutionProvider::default();
                    if let Some(id) = device_id {
                        cuda_provider = cuda_provider.with_device_id(*id);
                    }
                    providers.push(cuda_provider.build());
                }
                #[cfg(not(feature = "cuda"))]
                OrtExecutionProvider::CUDA { .. } => {
                    tracing::warn!(
                        "CUDA requested but this build lacks the `cuda` feature; using CPU"
                    );
                }
            }
        }

        providers
    }
}
