use std::path::Path;
use std::sync::Mutex;

use ndarray::ArrayD;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::TensorRef;

use crate::types::EngineConfig;

#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("ORT error: {0}")]
    Ort(#[from] ort::Error),

    #[error("Invalid output shape")]
    InvalidOutputShape,

    #[error("Session lock poisoned")]
    Poisoned,
}

/// ONNX Runtime session shared behind a lock.
///
/// `Session::run` needs exclusive access, so concurrent callers are serialized.
pub struct OrtSession {
    session: Mutex<Session>,
}

impl OrtSession {
    pub fn from_path(model_path: &Path, engine_cfg: &EngineConfig) -> Result<Self, EngineError> {
        let mut builder =
            Session::builder()?.with_optimization_level(GraphOptimizationLevel::Level3)?;

        if engine_cfg.intra_op_num_threads > 0 {
            builder = builder.with_intra_threads(engine_cfg.intra_op_num_threads)?;
        }

        if engine_cfg.inter_op_num_threads > 0 {
            builder = builder.with_inter_threads(engine_cfg.inter_op_num_threads)?;
        }

        if engine_cfg.use_gpu {
            builder = Self::with_gpu(builder)?;
        }

        let session = builder.commit_from_file(model_path)?;

        Ok(Self {
            session: Mutex::new(session),
        })
    }

    #[cfg(feature = "cuda")]
    fn with_gpu(
        builder: ort::session::builder::SessionBuilder,
    ) -> Result<ort::session::builder::SessionBuilder, EngineError> {
        use ort::execution_providers::CUDAExecutionProvider;

        Ok(builder.with_execution_providers([CUDAExecutionProvider::default().build()])?)
    }

    #[cfg(not(feature = "cuda"))]
    fn with_gpu(
        builder: ort::session::builder::SessionBuilder,
    ) -> Result<ort::session::builder::SessionBuilder, EngineError> {
        tracing::warn!("GPU requested but corebox was built without the `cuda` feature, using CPU");
        Ok(builder)
    }

    pub fn run(&self, input: ArrayD<f32>) -> Result<ArrayD<f32>, EngineError> {
        let mut session = self.session.lock().map_err(|_| EngineError::Poisoned)?;

        let input_ref = TensorRef::from_array_view(&input)?;
        let outputs = session.run(ort::inputs![input_ref])?;
        let (_, first) = outputs
            .iter()
            .next()
            .ok_or(EngineError::InvalidOutputShape)?;

        let tensor = first.try_extract_array::<f32>()?;
        Ok(tensor.to_owned())
    }
}
