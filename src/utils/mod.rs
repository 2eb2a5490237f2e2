//! Utility modules
//!
//! - Pixel filters and blends
//! - Luminance helpers
//! - Execution provider probing
//! - Tensor conversion for the learned models

pub mod color;
pub mod filters;
#[cfg(feature = "onnx")]
pub mod preprocessing;
pub mod providers;

pub use providers::{ExecutionProviderManager, ProviderInfo};
