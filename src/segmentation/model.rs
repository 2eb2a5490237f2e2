//! Learned segmentation model collaborator
//!
//! The learned tier is an external capability: given an RGB image it returns a soft
//! foreground mask. Models are created through a [`ModelFactory`] and kept warm in a
//! [`ModelCache`] so every in-flight request shares the same read-only handle.

use crate::{
    config::{ExecutionProvider, ServiceConfig},
    error::{IdPhotoError, Result},
    segmentation::{MaskOutcome, Segmenter},
    types::SegmentationMask,
    utils::ExecutionProviderManager,
};
use image::RgbImage;
use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{Arc, Mutex, MutexGuard},
};

/// Learned model variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelVariant {
    /// Model tuned for human subjects
    HumanPortrait,
    /// General-purpose salient object model
    General,
}

impl ModelVariant {
    /// Model file name inside the model directory
    #[must_use]
    pub fn file_name(self) -> &'static str {
        match self {
            Self::HumanPortrait => "u2net_human_seg.onnx",
            Self::General => "u2net.onnx",
        }
    }

    /// Pick a variant from the request hint and the hardware available
    ///
    /// The portrait model is heavier, so it is only chosen when the caller asked for
    /// acceleration and an accelerated provider exists.
    #[must_use]
    pub fn select(prefer_acceleration: bool, acceleration_available: bool) -> Self {
        if prefer_acceleration && acceleration_available {
            Self::HumanPortrait
        } else {
            Self::General
        }
    }

    /// All variants
    #[must_use]
    pub fn all() -> [Self; 2] {
        [Self::HumanPortrait, Self::General]
    }
}

impl std::fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HumanPortrait => write!(f, "human-portrait"),
            Self::General => write!(f, "general"),
        }
    }
}

/// A loaded learned model
///
/// Implementations must be safe to call concurrently; a model handle is never mutated
/// per request.
pub trait SegmentationModel: Send + Sync {
    /// Variant this handle was loaded for
    fn variant(&self) -> ModelVariant;

    /// Whether inference runs on an accelerated execution provider
    fn is_accelerated(&self) -> bool;

    /// Predict a foreground mask with the dimensions of `image`
    ///
    /// # Errors
    /// - Inference failure or malformed model output
    fn predict(&self, image: &RgbImage) -> Result<SegmentationMask>;
}

/// Creates model handles
pub trait ModelFactory: Send + Sync {
    /// Load the model for `variant`
    ///
    /// # Errors
    /// - `CapabilityUnavailable` when the model cannot be provided by this build or host
    /// - `Model` when loading fails
    fn create(&self, variant: ModelVariant) -> Result<Arc<dyn SegmentationModel>>;

    /// Whether an accelerated execution provider is usable
    fn acceleration_available(&self) -> bool;
}

/// Factory loading ONNX model files from the configured model directory
#[derive(Debug, Clone)]
pub struct DefaultModelFactory {
    model_dir: PathBuf,
    execution_provider: ExecutionProvider,
    intra_threads: usize,
}

impl DefaultModelFactory {
    #[must_use]
    pub fn new(config: &ServiceConfig) -> Self {
        Self {
            model_dir: config.model_dir.clone(),
            execution_provider: config.execution_provider,
            intra_threads: config.intra_threads,
        }
    }

    /// Full path of the model file for `variant`
    #[must_use]
    pub fn model_path(&self, variant: ModelVariant) -> PathBuf {
        self.model_dir.join(variant.file_name())
    }
}

impl ModelFactory for DefaultModelFactory {
    #[cfg(feature = "onnx")]
    fn create(&self, variant: ModelVariant) -> Result<Arc<dyn SegmentationModel>> {
        let path = self.model_path(variant);
        if !path.is_file() {
            return Err(IdPhotoError::capability_unavailable(
                "learned segmentation",
                format!("model file '{}' not found", path.display()),
            ));
        }

        let model = crate::backends::OnnxSegmentationModel::load(
            &path,
            variant,
            self.execution_provider,
            self.intra_threads,
        )?;
        Ok(Arc::new(model))
    }

    #[cfg(not(feature = "onnx"))]
    fn create(&self, variant: ModelVariant) -> Result<Arc<dyn SegmentationModel>> {
        log::trace!(
            "Cannot load {} from {} ({} intra-op threads, {}): built without the onnx feature",
            variant,
            self.model_dir.display(),
            self.intra_threads,
            self.execution_provider
        );
        Err(IdPhotoError::capability_unavailable(
            "learned segmentation",
            "built without the onnx feature",
        ))
    }

    fn acceleration_available(&self) -> bool {
        ExecutionProviderManager::is_accelerated(self.execution_provider)
    }
}

/// Warm model handles keyed by variant
///
/// A handle is created on first use and shared read-only afterwards. Each variant has
/// its own slot lock, so loading one variant never blocks requests served by another.
/// Creation failures are not cached, so a model installed later is picked up by the
/// next request.
pub struct ModelCache {
    factory: Arc<dyn ModelFactory>,
    slots: HashMap<ModelVariant, Mutex<Option<Arc<dyn SegmentationModel>>>>,
}

impl ModelCache {
    #[must_use]
    pub fn new(factory: Arc<dyn ModelFactory>) -> Self {
        let slots = ModelVariant::all()
            .into_iter()
            .map(|variant| (variant, Mutex::new(None)))
            .collect();
        Self { factory, slots }
    }

    /// Whether the factory reports an accelerated provider
    #[must_use]
    pub fn acceleration_available(&self) -> bool {
        self.factory.acceleration_available()
    }

    fn slot(
        &self,
        variant: ModelVariant,
    ) -> Result<MutexGuard<'_, Option<Arc<dyn SegmentationModel>>>> {
        self.slots
            .get(&variant)
            .ok_or_else(|| IdPhotoError::model(format!("No cache slot for {variant}")))?
            .lock()
            .map_err(|_| IdPhotoError::model("Model cache lock poisoned"))
    }

    /// Get the cached handle for `variant`, creating it if needed
    ///
    /// Concurrent callers asking for the same variant wait for a single load.
    ///
    /// # Errors
    /// - Any factory error
    /// - Poisoned cache lock
    pub fn get_or_create(&self, variant: ModelVariant) -> Result<Arc<dyn SegmentationModel>> {
        let mut slot = self.slot(variant)?;
        if let Some(model) = slot.as_ref() {
            log::debug!("Model cache hit for {}", variant);
            return Ok(Arc::clone(model));
        }

        let start = instant::Instant::now();
        let model = self.factory.create(variant)?;
        log::info!(
            "Loaded {} segmentation model in {:.0}ms",
            variant,
            start.elapsed().as_secs_f64() * 1000.0
        );
        *slot = Some(Arc::clone(&model));
        Ok(model)
    }

    /// Number of warm handles
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots
            .values()
            .filter(|slot| slot.lock().map(|m| m.is_some()).unwrap_or(false))
            .count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all warm handles
    pub fn clear(&self) {
        for slot in self.slots.values() {
            if let Ok(mut model) = slot.lock() {
                *model = None;
            }
        }
    }
}

impl std::fmt::Debug for ModelCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelCache")
            .field("cached_models", &self.len())
            .finish_non_exhaustive()
    }
}

/// Segmentation tier backed by the learned model collaborator
#[derive(Debug, Clone)]
pub struct LearnedSegmenter {
    cache: Arc<ModelCache>,
}

impl LearnedSegmenter {
    #[must_use]
    pub fn new(cache: Arc<ModelCache>) -> Self {
        Self { cache }
    }
}

impl Segmenter for LearnedSegmenter {
    fn name(&self) -> &'static str {
        "learned-model"
    }

    fn segment(&self, image: &RgbImage, prefer_acceleration: bool) -> Result<MaskOutcome> {
        let variant = ModelVariant::select(prefer_acceleration, self.cache.acceleration_available());
        let model = self.cache.get_or_create(variant)?;
        let mask = model.predict(image)?;

        if mask.dimensions != image.dimensions() {
            return Err(IdPhotoError::segmentation(format!(
                "Model returned a {}x{} mask for a {}x{} image",
                mask.dimensions.0,
                mask.dimensions.1,
                image.width(),
                image.height()
            )));
        }

        Ok(MaskOutcome {
            mask,
            accelerated: prefer_acceleration && model.is_accelerated(),
        })
    }
}
