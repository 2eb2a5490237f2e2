//! ID photo processor
//!
//! `IdPhotoProcessor` runs the whole pipeline for one request and is the error
//! boundary of the crate: every request yields exactly one structured result.
//!
//! decode → segment → refine alpha → compose → (enhance) → (clothing) → encode

use crate::{
    clothing::{ClothingOverlay, ClothingStatus},
    compose::{BackgroundColor, Compositor},
    config::{OutputFormat, ServiceConfig},
    enhance::EnhancementDispatcher,
    error::Result,
    refine::AlphaRefiner,
    request::{EnhanceRequest, EnhanceResponse, FeaturesUsed, ProcessingRequest, ProcessingResponse},
    segmentation::{DefaultModelFactory, ModelCache, ModelFactory, SegmentationEngine},
    services::{ImageIOService, OutputFormatHandler},
    types::{PhotoOutput, ProcessingResult, ProcessingTimings},
};
use instant::Instant;
use log::{debug, info};
use std::sync::Arc;
use tracing::{info_span, Instrument};
use uuid::Uuid;

/// Quality of JPEG output for standalone enhancement requests
const ENHANCE_JPEG_QUALITY: f32 = 0.9;

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// Orchestrates the ID photo pipeline
///
/// A processor is created once at startup. It holds no per-request state, so one
/// instance can serve concurrent requests; only the warm model handles are shared.
pub struct IdPhotoProcessor {
    config: ServiceConfig,
    models: Arc<ModelCache>,
    segmentation: SegmentationEngine,
    refiner: AlphaRefiner,
    compositor: Compositor,
    enhancer: EnhancementDispatcher,
    clothing: ClothingOverlay,
}

impl IdPhotoProcessor {
    /// Create a processor that loads models from `config.model_dir`
    ///
    /// # Errors
    /// - Invalid configuration
    pub fn new(config: ServiceConfig) -> Result<Self> {
        let factory = Arc::new(DefaultModelFactory::new(&config));
        Self::with_model_factory(config, factory)
    }

    /// Create a processor with a custom learned-model factory
    ///
    /// # Errors
    /// - Invalid configuration
    pub fn with_model_factory(config: ServiceConfig, factory: Arc<dyn ModelFactory>) -> Result<Self> {
        config.validate()?;

        let models = Arc::new(ModelCache::new(factory));
        let segmentation = SegmentationEngine::from_config(&config, Arc::clone(&models));
        let enhancer = EnhancementDispatcher::new(&config);

        info!(
            "ID photo processor ready (provider: {}, classical fallback: {})",
            config.execution_provider, config.classical_fallback
        );

        Ok(Self {
            config,
            models,
            segmentation,
            refiner: AlphaRefiner::default(),
            compositor: Compositor::default(),
            enhancer,
            clothing: ClothingOverlay,
        })
    }

    /// Replace the enhancement strategy table
    #[must_use]
    pub fn with_enhancer(mut self, enhancer: EnhancementDispatcher) -> Self {
        self.enhancer = enhancer;
        self
    }

    #[must_use]
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Warm learned-model handles shared by all requests
    #[must_use]
    pub fn model_cache(&self) -> &Arc<ModelCache> {
        &self.models
    }

    /// Process one request; never panics and never returns an unstructured error
    pub async fn process(&self, request: &ProcessingRequest) -> ProcessingResult {
        let span = info_span!(
            "id_photo_request",
            request_id = %Uuid::new_v4(),
            width = request.width,
            height = request.height,
            format = %request.format
        );

        let result = self.run_pipeline(request).instrument(span).await;
        if let Err(ref e) = result {
            log::warn!("Request failed: {}", e);
        }
        result.into()
    }

    /// Process one request into its wire response
    pub async fn process_to_response(&self, request: &ProcessingRequest) -> ProcessingResponse {
        match self.process(request).await {
            ProcessingResult::Success(output) => {
                let data_url = ImageIOService::to_data_url(&output.bytes, output.format);
                ProcessingResponse::success(&output, data_url)
            },
            ProcessingResult::Failure(e) => ProcessingResponse::failure(&e),
        }
    }

    /// Parse a JSON request and process it; malformed input becomes a failure response
    pub async fn handle_json(&self, json: &str) -> ProcessingResponse {
        match ProcessingRequest::from_json(json) {
            Ok(request) => self.process_to_response(&request).await,
            Err(e) => ProcessingResponse::failure(&e),
        }
    }

    async fn run_pipeline(&self, request: &ProcessingRequest) -> Result<PhotoOutput> {
        let mut timings = ProcessingTimings::default();
        let total_start = Instant::now();

        let format: OutputFormat = request.format.parse()?;

        let stage = Instant::now();
        let source = ImageIOService::decode_payload(&request.image_data)?.into_rgb8();
        timings.decode_ms = elapsed_ms(stage);
        debug!("Decoded {}x{} input", source.width(), source.height());

        let background = BackgroundColor::parse(&request.background_color)?;
        let target = Compositor::target_size(request.width, request.height)?;

        let stage = Instant::now();
        let foreground = self
            .segmentation
            .segment(&source, request.prefers_acceleration());
        timings.segmentation_ms = elapsed_ms(stage);
        drop(source);

        let stage = Instant::now();
        let cutout = self.refiner.refine(foreground.image);
        timings.refine_ms = elapsed_ms(stage);

        let stage = Instant::now();
        let mut canvas = self.compositor.compose_with(&cutout, background, target)?;
        timings.compose_ms = elapsed_ms(stage);

        if let Some(options) = &request.enhance_options {
            let stage = Instant::now();
            let outcome = self.enhancer.enhance(&canvas, options).await;
            debug!("Enhanced with the {} strategy", outcome.method);
            canvas = outcome.image;
            timings.enhance_ms = elapsed_ms(stage);
        }

        let (canvas, _) = self
            .clothing
            .apply_optional(canvas, request.clothing_type.as_deref());

        let stage = Instant::now();
        let bytes = OutputFormatHandler::encode(&canvas, format, request.quality)?;
        timings.encode_ms = elapsed_ms(stage);
        timings.total_ms = elapsed_ms(total_start);

        let breakdown = timings
            .breakdown_percentages()
            .into_iter()
            .map(|(stage, pct)| format!("{stage} {pct:.0}%"))
            .collect::<Vec<_>>()
            .join(", ");
        debug!(
            "Timings: decode {}ms, segmentation {}ms, refine {}ms, compose {}ms, enhance {}ms, encode {}ms ({})",
            timings.decode_ms,
            timings.segmentation_ms,
            timings.refine_ms,
            timings.compose_ms,
            timings.enhance_ms,
            timings.encode_ms,
            breakdown
        );
        info!(
            "Produced {}x{} {} ({} bytes, tier {}) in {}ms",
            canvas.width(),
            canvas.height(),
            format,
            bytes.len(),
            foreground.tier,
            timings.total_ms
        );

        Ok(PhotoOutput {
            width: canvas.width(),
            height: canvas.height(),
            bytes,
            format,
            used_acceleration: foreground.accelerated,
            tier: foreground.tier,
            timings,
        })
    }

    /// Run a standalone enhancement request
    pub async fn enhance(&self, request: &EnhanceRequest) -> EnhanceResponse {
        let span = info_span!(
            "enhance_request",
            request_id = %Uuid::new_v4(),
            method = %request.enhance_options.method
        );

        match self.run_enhancement(request).instrument(span).await {
            Ok(response) => response,
            Err(e) => {
                log::warn!("Enhancement request failed: {}", e);
                EnhanceResponse::failure(&e)
            },
        }
    }

    /// Parse a JSON enhancement request and run it
    pub async fn handle_enhance_json(&self, json: &str) -> EnhanceResponse {
        match EnhanceRequest::from_json(json) {
            Ok(request) => self.enhance(&request).await,
            Err(e) => EnhanceResponse::failure(&e),
        }
    }

    async fn run_enhancement(&self, request: &EnhanceRequest) -> Result<EnhanceResponse> {
        let options = &request.enhance_options;
        let format: OutputFormat = options.format.parse()?;
        let image = ImageIOService::decode_payload(&request.image_data)?.into_rgba8();

        let outcome = self.enhancer.enhance(&image, options).await;
        let (image, clothing) = self
            .clothing
            .apply_optional(outcome.image, request.clothing_type.as_deref());

        let bytes = OutputFormatHandler::encode(&image, format, ENHANCE_JPEG_QUALITY)?;
        let message = match clothing {
            ClothingStatus::Unavailable => "Image enhanced; clothing change is not available",
            ClothingStatus::NotRequested | ClothingStatus::Applied => "Image enhanced successfully",
        };

        Ok(EnhanceResponse {
            success: true,
            image_data: Some(ImageIOService::to_data_url(&bytes, format)),
            message: message.to_string(),
            features_used: Some(FeaturesUsed {
                enhancement: outcome.method.to_string(),
                clothing_change: clothing.as_str().to_string(),
            }),
            error: None,
        })
    }
}

impl std::fmt::Debug for IdPhotoProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdPhotoProcessor")
            .field("config", &self.config)
            .field("models", &self.models)
            .field("segmentation", &self.segmentation)
            .field("enhancer", &self.enhancer)
            .finish_non_exhaustive()
    }
}
