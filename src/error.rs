//! Error types for ID photo processing

use thiserror::Error;

/// Result type alias for ID photo operations
pub type Result<T> = std::result::Result<T, IdPhotoError>;

/// Error taxonomy for the ID photo pipeline
///
/// `Decode`, `Composition`, `Encoding` and `InvalidRequest` terminate a request and are
/// reported verbatim in the failure response. `Segmentation`, `RemoteEnhancement` and
/// `CapabilityUnavailable` are always recovered inside the pipeline.
#[derive(Error, Debug)]
pub enum IdPhotoError {
    /// Malformed or undecodable image payload
    #[error("Decode error: {0}")]
    Decode(String),

    /// Invalid background color or target dimensions
    #[error("Composition error: {0}")]
    Composition(String),

    /// Unsupported output format or encoder failure
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Learned-model or classical segmentation failure
    #[error("Segmentation error: {0}")]
    Segmentation(String),

    /// Network, timeout or bad response from a remote enhancement provider
    #[error("Remote enhancement error: {0}")]
    RemoteEnhancement(String),

    /// A capability that exists in the contract but is not provided by this build
    #[error("Capability unavailable: {capability} ({reason})")]
    CapabilityUnavailable { capability: String, reason: String },

    /// Structurally invalid request (bad JSON, missing fields)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid service configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Model loading or inference errors
    #[error("Model error: {0}")]
    Model(String),

    /// Input/output errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors bubbled up from the image crate
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),
}

impl IdPhotoError {
    /// Create a new decode error
    pub fn decode<S: Into<String>>(msg: S) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a new composition error
    pub fn composition<S: Into<String>>(msg: S) -> Self {
        Self::Composition(msg.into())
    }

    /// Create a new encoding error
    pub fn encoding<S: Into<String>>(msg: S) -> Self {
        Self::Encoding(msg.into())
    }

    /// Create a new segmentation error
    pub fn segmentation<S: Into<String>>(msg: S) -> Self {
        Self::Segmentation(msg.into())
    }

    /// Create a new remote enhancement error
    pub fn remote_enhancement<S: Into<String>>(msg: S) -> Self {
        Self::RemoteEnhancement(msg.into())
    }

    /// Create a capability-unavailable error
    pub fn capability_unavailable<C: Into<String>, R: Into<String>>(capability: C, reason: R) -> Self {
        Self::CapabilityUnavailable {
            capability: capability.into(),
            reason: reason.into(),
        }
    }

    /// Create a new invalid request error
    pub fn invalid_request<S: Into<String>>(msg: S) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new model error
    pub fn model<S: Into<String>>(msg: S) -> Self {
        Self::Model(msg.into())
    }

    /// Create file I/O error with operation context
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: &std::io::Error,
    ) -> Self {
        let path_display = path.as_ref().display();
        Self::Io(std::io::Error::new(
            error.kind(),
            format!("Failed to {} '{}': {}", operation, path_display, error),
        ))
    }

    /// Create configuration error with valid ranges
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
        recommended: Option<T>,
    ) -> Self {
        let recommendation = match recommended {
            Some(rec) => format!(" Recommended: {}", rec),
            None => String::new(),
        };

        Self::InvalidConfig(format!(
            "Invalid {}: {} (valid range: {}).{}",
            parameter, value, valid_range, recommendation
        ))
    }

    /// Whether the pipeline is expected to recover from this error internally
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Segmentation(_)
                | Self::RemoteEnhancement(_)
                | Self::CapabilityUnavailable { .. }
                | Self::Model(_)
        )
    }
}
