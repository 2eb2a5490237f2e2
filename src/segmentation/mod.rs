//! Foreground extraction
//!
//! The engine runs an ordered list of segmentation strategies (learned model first,
//! classical second) and always yields an RGBA foreground. If every strategy fails the
//! original image is returned with a fully opaque alpha channel.

pub mod classical;
pub mod model;

#[cfg(test)]
pub(crate) mod test_utils;

pub use classical::{ClassicalParams, ClassicalSegmenter};
pub use model::{
    DefaultModelFactory, LearnedSegmenter, ModelCache, ModelFactory, ModelVariant,
    SegmentationModel,
};

use crate::{
    config::ServiceConfig,
    error::{IdPhotoError, Result},
    types::{Foreground, SegmentationMask, SegmentationTier},
};
use image::{DynamicImage, RgbImage};
use std::sync::Arc;
use tracing::instrument;

/// Mask produced by one segmentation strategy
#[derive(Debug, Clone)]
pub struct MaskOutcome {
    pub mask: SegmentationMask,
    /// Whether an accelerated provider produced the mask
    pub accelerated: bool,
}

/// Common capability of every segmentation strategy
pub trait Segmenter {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Produce a mask with the dimensions of `image`
    ///
    /// # Errors
    /// - The strategy is unavailable or failed on this image
    fn segment(&self, image: &RgbImage, prefer_acceleration: bool) -> Result<MaskOutcome>;
}

/// Segmentation strategies the engine can run
#[derive(Debug, Clone)]
pub enum SegmentationStrategy {
    Learned(LearnedSegmenter),
    Classical(ClassicalSegmenter),
}

impl SegmentationStrategy {
    /// Tier reported for a foreground produced by this strategy
    #[must_use]
    pub fn tier(&self) -> SegmentationTier {
        match self {
            Self::Learned(_) => SegmentationTier::LearnedModel,
            Self::Classical(_) => SegmentationTier::Classical,
        }
    }
}

impl Segmenter for SegmentationStrategy {
    fn name(&self) -> &'static str {
        match self {
            Self::Learned(s) => s.name(),
            Self::Classical(s) => s.name(),
        }
    }

    fn segment(&self, image: &RgbImage, prefer_acceleration: bool) -> Result<MaskOutcome> {
        match self {
            Self::Learned(s) => s.segment(image, prefer_acceleration),
            Self::Classical(s) => s.segment(image, prefer_acceleration),
        }
    }
}

/// Ordered multi-tier segmentation
#[derive(Debug, Clone)]
pub struct SegmentationEngine {
    strategies: Vec<SegmentationStrategy>,
}

impl SegmentationEngine {
    /// Engine running `strategies` in order
    #[must_use]
    pub fn new(strategies: Vec<SegmentationStrategy>) -> Self {
        Self { strategies }
    }

    /// Learned model backed by `cache`, then the classical segmenter if enabled
    #[must_use]
    pub fn from_config(config: &ServiceConfig, cache: Arc<ModelCache>) -> Self {
        let mut strategies = vec![SegmentationStrategy::Learned(LearnedSegmenter::new(cache))];
        if config.classical_fallback {
            strategies.push(SegmentationStrategy::Classical(ClassicalSegmenter::default()));
        }
        Self::new(strategies)
    }

    /// Engine with only the classical tier
    #[must_use]
    pub fn classical_only() -> Self {
        Self::new(vec![SegmentationStrategy::Classical(
            ClassicalSegmenter::default(),
        )])
    }

    #[must_use]
    pub fn strategies(&self) -> &[SegmentationStrategy] {
        &self.strategies
    }

    /// Extract the foreground of `image`; never fails
    #[instrument(skip(self, image), fields(width = image.width(), height = image.height()))]
    pub fn segment(&self, image: &RgbImage, prefer_acceleration: bool) -> Foreground {
        for strategy in &self.strategies {
            let attempt = strategy.segment(image, prefer_acceleration).and_then(|outcome| {
                let coverage = outcome.mask.coverage();
                Ok((outcome.mask.apply_to(image)?, outcome.accelerated, coverage))
            });

            match attempt {
                Ok((rgba, accelerated, coverage)) => {
                    log::debug!(
                        "Foreground extracted by the {} tier ({:.1}% coverage)",
                        strategy.name(),
                        coverage * 100.0
                    );
                    return Foreground {
                        image: rgba,
                        tier: strategy.tier(),
                        accelerated,
                    };
                },
                Err(IdPhotoError::CapabilityUnavailable { capability, reason }) => {
                    log::info!("{} unavailable ({}), trying next tier", capability, reason);
                },
                Err(e) => {
                    log::warn!("{} segmentation failed: {}", strategy.name(), e);
                },
            }
        }

        log::warn!("All segmentation tiers failed, keeping the original background");
        Foreground {
            image: DynamicImage::ImageRgb8(image.clone()).into_rgba8(),
            tier: SegmentationTier::OpaquePassthrough,
            accelerated: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmentation::test_utils::{MockBehavior, MockModelFactory};
    use image::Rgb;

    fn engine_with(behavior: MockBehavior, classical: bool) -> SegmentationEngine {
        let cache = Arc::new(ModelCache::new(Arc::new(MockModelFactory::new(
            behavior, false,
        ))));
        let config = ServiceConfig::builder()
            .classical_fallback(classical)
            .build()
            .unwrap();
        SegmentationEngine::from_config(&config, cache)
    }

    fn portrait() -> RgbImage {
        let mut image = RgbImage::from_pixel(60, 80, Rgb([10, 10, 10]));
        for y in 20..70 {
            for x in 15..45 {
                image.put_pixel(x, y, Rgb([220, 200, 180]));
            }
        }
        image
    }

    #[test]
    fn test_learned_tier_first() {
        let foreground = engine_with(MockBehavior::Circle, true).segment(&portrait(), true);
        assert_eq!(foreground.tier, SegmentationTier::LearnedModel);
        assert_eq!(foreground.image.dimensions(), (60, 80));
    }

    #[test]
    fn test_unavailable_model_falls_back_to_classical() {
        let foreground = engine_with(MockBehavior::Unavailable, true).segment(&portrait(), true);
        assert_eq!(foreground.tier, SegmentationTier::Classical);
        assert!(!foreground.accelerated);
        assert_eq!(foreground.image.get_pixel(30, 45)[3], 255);
        assert_eq!(foreground.image.get_pixel(2, 2)[3], 0);
    }

    #[test]
    fn test_failing_model_falls_back_to_classical() {
        let foreground =
            engine_with(MockBehavior::FailingInference, true).segment(&portrait(), false);
        assert_eq!(foreground.tier, SegmentationTier::Classical);
    }

    #[test]
    fn test_total_failure_is_opaque_passthrough() {
        let image = portrait();
        let foreground = engine_with(MockBehavior::FailingInference, false).segment(&image, true);

        assert_eq!(foreground.tier, SegmentationTier::OpaquePassthrough);
        assert!(foreground.image.pixels().all(|p| p[3] == 255));
        assert_eq!(foreground.image.get_pixel(0, 0).0, [10, 10, 10, 255]);
    }

    #[test]
    fn test_empty_engine_passthrough() {
        let foreground = SegmentationEngine::new(Vec::new()).segment(&portrait(), false);
        assert_eq!(foreground.tier, SegmentationTier::OpaquePassthrough);
    }

    #[test]
    fn test_strategy_order_from_config() {
        let engine = engine_with(MockBehavior::Circle, true);
        let names: Vec<_> = engine.strategies().iter().map(Segmenter::name).collect();
        assert_eq!(names, vec!["learned-model", "classical"]);
        assert_eq!(SegmentationEngine::classical_only().strategies().len(), 1);
    }
}
