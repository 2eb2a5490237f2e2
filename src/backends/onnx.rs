//! ONNX Runtime implementation of the learned segmentation model
//!
//! Runs U²-Net style portrait and general models with CPU, CUDA or `CoreML` execution
//! providers.

use crate::config::ExecutionProvider;
use crate::error::{IdPhotoError, Result};
use crate::segmentation::{ModelVariant, SegmentationModel};
use crate::types::SegmentationMask;
use crate::utils::preprocessing::{ImagePreprocessor, PreprocessingConfig};
use image::RgbImage;
use ort::execution_providers::{
    CUDAExecutionProvider, CoreMLExecutionProvider, ExecutionProvider as OrtExecutionProvider,
};
use ort::session::{
    builder::{GraphOptimizationLevel, SessionBuilder},
    Session,
};
use ort::{self, value::Value};
use std::path::Path;
use std::sync::Mutex;

/// Loaded ONNX segmentation model
///
/// `Session::run` needs exclusive access, so the session sits behind a mutex; the handle
/// itself is shared read-only between requests.
#[derive(Debug)]
pub struct OnnxSegmentationModel {
    session: Mutex<Session>,
    variant: ModelVariant,
    accelerated: bool,
    preprocessing: PreprocessingConfig,
}

impl OnnxSegmentationModel {
    /// Create a session for the model file at `path`
    ///
    /// # Errors
    /// - Session creation or provider registration fails
    /// - The file is not a loadable ONNX model
    pub fn load(
        path: &Path,
        variant: ModelVariant,
        provider: ExecutionProvider,
        intra_threads: usize,
    ) -> Result<Self> {
        let builder = Session::builder()
            .map_err(|e| IdPhotoError::model(format!("Failed to create session builder: {e}")))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| IdPhotoError::model(format!("Failed to set optimization level: {e}")))?;

        let (builder, accelerated) = Self::configure_providers(builder, provider)?;

        let intra_threads = if intra_threads > 0 {
            intra_threads
        } else {
            std::thread::available_parallelism()
                .map(std::num::NonZero::get)
                .unwrap_or(4)
        };

        let session = builder
            .with_intra_threads(intra_threads)
            .map_err(|e| IdPhotoError::model(format!("Failed to set intra threads: {e}")))?
            .commit_from_file(path)
            .map_err(|e| {
                IdPhotoError::model(format!(
                    "Failed to load model '{}': {e}",
                    path.display()
                ))
            })?;

        log::debug!(
            "ONNX session ready: variant={}, provider={}, accelerated={}, intra_threads={}",
            variant,
            provider,
            accelerated,
            intra_threads
        );

        Ok(Self {
            session: Mutex::new(session),
            variant,
            accelerated,
            preprocessing: PreprocessingConfig::default(),
        })
    }

    /// Register execution providers, returning whether any accelerator was added
    fn configure_providers(
        builder: SessionBuilder,
        provider: ExecutionProvider,
    ) -> Result<(SessionBuilder, bool)> {
        let cuda = CUDAExecutionProvider::default();
        let cuda_available = OrtExecutionProvider::is_available(&cuda).unwrap_or(false);
        let coreml = CoreMLExecutionProvider::default();
        let coreml_available = OrtExecutionProvider::is_available(&coreml).unwrap_or(false);

        let mut providers = Vec::new();
        match provider {
            ExecutionProvider::Auto => {
                if cuda_available {
                    providers.push(cuda.build());
                }
                if coreml_available {
                    providers.push(coreml.with_subgraphs(true).build());
                }
            },
            ExecutionProvider::Cuda => {
                if cuda_available {
                    providers.push(cuda.build());
                } else {
                    log::warn!("CUDA execution provider requested but not available, using CPU");
                }
            },
            ExecutionProvider::CoreMl => {
                if coreml_available {
                    providers.push(coreml.with_subgraphs(true).build());
                } else {
                    log::warn!("CoreML execution provider requested but not available, using CPU");
                }
            },
            ExecutionProvider::Cpu => {},
        }

        if providers.is_empty() {
            log::info!("Using CPU execution provider");
            return Ok((builder, false));
        }

        log::info!(
            "Hardware acceleration enabled with {count} provider(s)",
            count = providers.len()
        );
        let builder = builder.with_execution_providers(providers).map_err(|e| {
            IdPhotoError::model(format!("Failed to set execution providers: {e}"))
        })?;
        Ok((builder, true))
    }
}

impl SegmentationModel for OnnxSegmentationModel {
    fn variant(&self) -> ModelVariant {
        self.variant
    }

    fn is_accelerated(&self) -> bool {
        self.accelerated
    }

    fn predict(&self, image: &RgbImage) -> Result<SegmentationMask> {
        let start = instant::Instant::now();
        let tensor = ImagePreprocessor::image_to_tensor(image, &self.preprocessing);
        let input = Value::from_array(tensor)
            .map_err(|e| IdPhotoError::model(format!("Failed to convert input tensor: {e}")))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| IdPhotoError::model("ONNX session lock poisoned"))?;
        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| IdPhotoError::model(format!("ONNX inference failed: {e}")))?;

        // Positional access: U²-Net exports name their outputs inconsistently
        let keys: Vec<_> = outputs.keys().collect();
        let first_key = keys
            .first()
            .ok_or_else(|| IdPhotoError::model("No output tensors found"))?;
        let output = outputs
            .get(first_key)
            .ok_or_else(|| IdPhotoError::model("First output tensor not found"))?
            .try_extract_array::<f32>()
            .map_err(|e| IdPhotoError::model(format!("Failed to extract output tensor: {e}")))?;

        let mask = ImagePreprocessor::tensor_to_mask(&output.view(), image.dimensions())?;
        log::debug!(
            "{} inference: {:.2}ms",
            self.variant,
            start.elapsed().as_secs_f64() * 1000.0
        );
        Ok(mask)
    }
}
