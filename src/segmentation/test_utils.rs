//! Mock learned models for testing the segmentation tiers without model files

use crate::{
    error::{IdPhotoError, Result},
    segmentation::model::{ModelFactory, ModelVariant, SegmentationModel},
    types::SegmentationMask,
};
use image::RgbImage;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

/// How a mock model behaves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockBehavior {
    /// Soft circular mask centred in the image
    Circle,
    /// Inference always fails
    FailingInference,
    /// Factory reports the model unavailable
    Unavailable,
    /// Inference returns a mask of the wrong size
    WrongSize,
}

/// Mock model producing a centred circle
#[derive(Debug)]
pub struct MockSegmentationModel {
    variant: ModelVariant,
    accelerated: bool,
    behavior: MockBehavior,
}

impl MockSegmentationModel {
    #[must_use]
    pub fn new(variant: ModelVariant, accelerated: bool, behavior: MockBehavior) -> Self {
        Self {
            variant,
            accelerated,
            behavior,
        }
    }

    fn circle_mask(width: u32, height: u32) -> SegmentationMask {
        let center_x = width as f32 / 2.0;
        let center_y = height as f32 / 2.0;
        let radius = (width.min(height) as f32 / 3.0).max(1.0);

        let mut data = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                let dx = x as f32 + 0.5 - center_x;
                let dy = y as f32 + 0.5 - center_y;
                let distance = (dx * dx + dy * dy).sqrt();
                data.push(if distance < radius { 255 } else { 0 });
            }
        }
        SegmentationMask {
            data,
            dimensions: (width, height),
        }
    }
}

impl SegmentationModel for MockSegmentationModel {
    fn variant(&self) -> ModelVariant {
        self.variant
    }

    fn is_accelerated(&self) -> bool {
        self.accelerated
    }

    fn predict(&self, image: &RgbImage) -> Result<SegmentationMask> {
        match self.behavior {
            MockBehavior::Circle | MockBehavior::Unavailable => {
                Ok(Self::circle_mask(image.width(), image.height()))
            },
            MockBehavior::FailingInference => Err(IdPhotoError::model("Mock inference failure")),
            MockBehavior::WrongSize => Ok(SegmentationMask::filled((1, 1), 255)),
        }
    }
}

/// Factory handing out mock models
#[derive(Debug)]
pub struct MockModelFactory {
    behavior: MockBehavior,
    accelerated: bool,
    creations: AtomicUsize,
}

impl MockModelFactory {
    #[must_use]
    pub fn new(behavior: MockBehavior, accelerated: bool) -> Self {
        Self {
            behavior,
            accelerated,
            creations: AtomicUsize::new(0),
        }
    }

    /// Number of `create` calls so far
    pub fn creations(&self) -> usize {
        self.creations.load(Ordering::SeqCst)
    }
}

impl ModelFactory for MockModelFactory {
    fn create(&self, variant: ModelVariant) -> Result<Arc<dyn SegmentationModel>> {
        self.creations.fetch_add(1, Ordering::SeqCst);
        if self.behavior == MockBehavior::Unavailable {
            return Err(IdPhotoError::capability_unavailable(
                "learned segmentation",
                "mock model not installed",
            ));
        }
        Ok(Arc::new(MockSegmentationModel::new(
            variant,
            self.accelerated,
            self.behavior,
        )))
    }

    fn acceleration_available(&self) -> bool {
        self.accelerated
    }
}
