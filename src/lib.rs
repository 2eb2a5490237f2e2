#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unused_async)]

//! # idphoto
//!
//! ID photo generation: the subject of a portrait is separated from its
//! background, placed on a solid-color canvas of the requested size, optionally
//! enhanced, and encoded as JPEG or PNG.
//!
//! ## Pipeline
//!
//! 1. Decode the payload (raw base64 or a `data:` URL)
//! 2. Segment the subject: learned model, then a classical Otsu/morphology
//!    segmenter, then an opaque passthrough. Segmentation never fails a request.
//! 3. Soften the alpha channel
//! 4. Fit the cutout onto the canvas (aspect preserved, centred, alpha-blended)
//! 5. Enhance when `enhanceOptions` is present; remote strategies fall back to
//!    the local basic chain
//! 6. Encode and return a data URL
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use idphoto::{IdPhotoProcessor, ProcessingRequest, ServiceConfig};
//!
//! # async fn example(payload: String) -> anyhow::Result<()> {
//! let processor = IdPhotoProcessor::new(ServiceConfig::default())?;
//!
//! let request = ProcessingRequest {
//!     background_color: "#438EDB".to_string(),
//!     ..ProcessingRequest::new(payload)
//! };
//! let response = processor.process_to_response(&request).await;
//! println!("{}", response.to_json());
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `onnx`: learned segmentation through ONNX Runtime (CUDA / `CoreML` capable)
//! - `cli` (default): the `idphoto` binary and its tracing subscriber
//! - `tracing-json`: JSON log output for the binary
//!
//! Without `onnx` the classical segmenter handles every request.

pub mod backends;
#[cfg(feature = "cli")]
pub mod cli;
pub mod clothing;
pub mod compose;
pub mod config;
pub mod enhance;
pub mod error;
pub mod processor;
pub mod refine;
pub mod request;
pub mod segmentation;
pub mod services;
#[cfg(feature = "cli")]
pub mod tracing_config;
pub mod types;
pub mod utils;

// Public API exports
#[cfg(feature = "onnx")]
pub use backends::OnnxSegmentationModel;
pub use clothing::{ClothingOverlay, ClothingStatus};
pub use compose::{BackgroundColor, Compositor};
pub use config::{
    ExecutionProvider, OutputFormat, RemoteProviderConfig, ServiceConfig, ServiceConfigBuilder,
    TencentCredentials,
};
pub use enhance::{
    BasicEnhancer, EnhanceMethod, EnhanceOptions, EnhancementDispatcher, Enhancer,
    RemoteBeautifyEnhancer,
};
pub use error::{IdPhotoError, Result};
pub use processor::IdPhotoProcessor;
pub use refine::AlphaRefiner;
pub use request::{
    EnhanceRequest, EnhanceResponse, FeaturesUsed, ProcessingRequest, ProcessingResponse,
};
pub use segmentation::{
    ClassicalSegmenter, ModelCache, ModelFactory, ModelVariant, SegmentationEngine,
    SegmentationModel, Segmenter,
};
pub use services::{ImageIOService, OutputFormatHandler};
pub use types::{
    Foreground, PhotoOutput, ProcessingResult, ProcessingTimings, SegmentationMask,
    SegmentationTier,
};
pub use utils::{ExecutionProviderManager, ProviderInfo};

#[cfg(feature = "cli")]
pub use tracing_config::{init_cli_tracing, TracingConfig, TracingFormat};
