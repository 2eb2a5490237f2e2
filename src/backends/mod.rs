//! Inference backends for the learned segmentation tier
//!
//! - ONNX Runtime backend (CPU, CUDA and `CoreML` execution providers)

#[cfg(feature = "onnx")]
pub mod onnx;

#[cfg(feature = "onnx")]
pub use self::onnx::OnnxSegmentationModel;
