//! JSON request and response contract
//!
//! Field names follow the wire format: camelCase at the top level, snake_case inside
//! `enhanceOptions`.

use crate::{
    enhance::EnhanceOptions,
    error::{IdPhotoError, Result},
    types::PhotoOutput,
};
use serde::{Deserialize, Serialize};

const DEFAULT_BACKGROUND: &str = "#FFFFFF";
const DEFAULT_WIDTH: i64 = 295;
const DEFAULT_HEIGHT: i64 = 413;
const DEFAULT_QUALITY: f32 = 0.8;

fn default_background() -> String {
    DEFAULT_BACKGROUND.to_string()
}
fn default_width() -> i64 {
    DEFAULT_WIDTH
}
fn default_height() -> i64 {
    DEFAULT_HEIGHT
}
fn default_quality() -> f32 {
    DEFAULT_QUALITY
}
fn default_format() -> String {
    "jpeg".to_string()
}

/// One ID photo request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingRequest {
    /// Raw base64 or data URL
    pub image_data: String,
    #[serde(default = "default_background")]
    pub background_color: String,
    #[serde(default = "default_width")]
    pub width: i64,
    #[serde(default = "default_height")]
    pub height: i64,
    /// Lossy quality in `[0, 1]`
    #[serde(default = "default_quality")]
    pub quality: f32,
    #[serde(default = "default_format")]
    pub format: String,
    /// Acceleration hint; absent means "use it if available"
    #[serde(default, rename = "useGPU")]
    pub use_gpu: Option<bool>,
    /// Enhancement runs only when this is present
    #[serde(default)]
    pub enhance_options: Option<EnhanceOptions>,
    #[serde(default)]
    pub clothing_type: Option<String>,
}

impl ProcessingRequest {
    /// Request with every optional field at its default
    #[must_use]
    pub fn new<S: Into<String>>(image_data: S) -> Self {
        Self {
            image_data: image_data.into(),
            background_color: default_background(),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            quality: DEFAULT_QUALITY,
            format: default_format(),
            use_gpu: None,
            enhance_options: None,
            clothing_type: None,
        }
    }

    /// Parse a request from JSON
    ///
    /// # Errors
    /// - Malformed JSON or a missing `imageData`
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| IdPhotoError::invalid_request(format!("Malformed request: {}", e)))
    }

    /// Effective acceleration hint
    #[must_use]
    pub fn prefers_acceleration(&self) -> bool {
        self.use_gpu.unwrap_or(true)
    }
}

/// Response to a [`ProcessingRequest`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(rename = "usedGPU")]
    pub used_gpu: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProcessingResponse {
    /// Success record for an encoded output
    #[must_use]
    pub fn success(output: &PhotoOutput, data_url: String) -> Self {
        Self {
            success: true,
            image_data: Some(data_url),
            file_size: Some(output.file_size()),
            width: Some(output.width),
            height: Some(output.height),
            used_gpu: output.used_acceleration,
            error: None,
        }
    }

    /// Failure record carrying the error message verbatim
    #[must_use]
    pub fn failure(error: &IdPhotoError) -> Self {
        Self {
            success: false,
            image_data: None,
            file_size: None,
            width: None,
            height: None,
            used_gpu: false,
            error: Some(error.to_string()),
        }
    }

    /// Serialize to a JSON string
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(
                r#"{{"success":false,"usedGPU":false,"error":"Failed to serialize response: {}"}}"#,
                e.to_string().replace('"', "'")
            )
        })
    }
}

/// Standalone enhancement request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhanceRequest {
    pub image_data: String,
    #[serde(default)]
    pub enhance_options: EnhanceOptions,
    #[serde(default)]
    pub clothing_type: Option<String>,
}

impl EnhanceRequest {
    /// Parse a request from JSON
    ///
    /// # Errors
    /// - Malformed JSON or a missing `imageData`
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| IdPhotoError::invalid_request(format!("Malformed request: {}", e)))
    }
}

/// Features reported by an enhancement response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeaturesUsed {
    /// Enhancement method that produced the image
    pub enhancement: String,
    /// `none`, `applied` or `unavailable`
    pub clothing_change: String,
}

/// Response to an [`EnhanceRequest`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhanceResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_data: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features_used: Option<FeaturesUsed>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EnhanceResponse {
    #[must_use]
    pub fn failure(error: &IdPhotoError) -> Self {
        Self {
            success: false,
            image_data: None,
            message: "Enhancement failed".to_string(),
            features_used: None,
            error: Some(error.to_string()),
        }
    }

    /// Serialize to a JSON string
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(
                r#"{{"success":false,"message":"Enhancement failed","error":"Failed to serialize response: {}"}}"#,
                e.to_string().replace('"', "'")
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enhance::EnhanceMethod;

    #[test]
    fn test_request_defaults() {
        let request = ProcessingRequest::from_json(r#"{"imageData": "abc"}"#).unwrap();
        assert_eq!(request, ProcessingRequest::new("abc"));
        assert_eq!(request.background_color, "#FFFFFF");
        assert_eq!((request.width, request.height), (295, 413));
        assert!(request.prefers_acceleration());
        assert!(request.enhance_options.is_none());
    }

    #[test]
    fn test_request_full() {
        let json = r#"{
            "imageData": "data:image/png;base64,AAAA",
            "backgroundColor": "112233",
            "width": 100,
            "height": -4,
            "quality": 0.5,
            "format": "PNG",
            "useGPU": false,
            "enhanceOptions": {"method": "aliyun", "skin_smooth": false},
            "clothingType": "suit"
        }"#;
        let request = ProcessingRequest::from_json(json).unwrap();
        assert_eq!(request.height, -4);
        assert!(!request.prefers_acceleration());
        let options = request.enhance_options.unwrap();
        assert_eq!(options.method, EnhanceMethod::RemoteA);
        assert!(!options.skin_smooth);
        assert!((options.brightness - 1.1).abs() < f32::EPSILON);
        assert_eq!(request.clothing_type.as_deref(), Some("suit"));
    }

    #[test]
    fn test_request_errors() {
        for json in ["", "{}", "not json", r#"{"imageData": 5}"#] {
            let err = ProcessingRequest::from_json(json).unwrap_err();
            assert!(matches!(err, IdPhotoError::InvalidRequest(_)), "{json}");
        }
    }

    #[test]
    fn test_failure_response_shape() {
        let response = ProcessingResponse::failure(&IdPhotoError::composition("bad color"));
        let value: serde_json::Value = serde_json::from_str(&response.to_json()).unwrap();

        assert_eq!(value["success"], false);
        assert_eq!(value["usedGPU"], false);
        assert_eq!(value["error"], "Composition error: bad color");
        assert!(value.get("imageData").is_none());
    }

    #[test]
    fn test_enhance_request_defaults() {
        let request = EnhanceRequest::from_json(r#"{"imageData": "abc"}"#).unwrap();
        assert_eq!(request.enhance_options, EnhanceOptions::default());
        assert!(request.clothing_type.is_none());
    }

    #[test]
    fn test_enhance_response_shape() {
        let response = EnhanceResponse {
            success: true,
            image_data: Some("data:image/jpeg;base64,AA".to_string()),
            message: "ok".to_string(),
            features_used: Some(FeaturesUsed {
                enhancement: "basic".to_string(),
                clothing_change: "none".to_string(),
            }),
            error: None,
        };
        let value: serde_json::Value = serde_json::from_str(&response.to_json()).unwrap();
        assert_eq!(value["featuresUsed"]["clothingChange"], "none");
        assert!(value.get("error").is_none());
    }
}
