//! Remote beautification provider (`remote-a`)
//!
//! Sends the image as base64 JPEG to an HTTP endpoint authenticated with an
//! application code, and decodes the beautified image from the JSON reply.

use super::{EnhanceOptions, Enhancer};
use crate::{
    config::{OutputFormat, RemoteProviderConfig},
    error::{IdPhotoError, Result},
    services::{ImageIOService, OutputFormatHandler},
};
use async_trait::async_trait;
use image::RgbaImage;
use reqwest::{header::AUTHORIZATION, Client};
use serde::{Deserialize, Serialize};

/// Quality of the JPEG uploaded to the provider
const UPLOAD_QUALITY: f32 = 0.9;

#[derive(Debug, Serialize)]
struct BeautifyRequest {
    image: String,
    degree: f32,
}

#[derive(Debug, Deserialize)]
struct BeautifyResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<BeautifyData>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BeautifyData {
    image: Option<String>,
}

/// HTTP client for the remote beautification service
#[derive(Debug, Clone)]
pub struct RemoteBeautifyEnhancer {
    client: Client,
    endpoint: String,
    app_code: Option<String>,
    default_degree: f32,
}

impl RemoteBeautifyEnhancer {
    /// Create the client; the configured timeout bounds every request
    ///
    /// # Errors
    /// - Failed to create the HTTP client
    pub fn new(config: &RemoteProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| {
                IdPhotoError::remote_enhancement(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            app_code: config.app_code.clone().filter(|code| !code.trim().is_empty()),
            default_degree: config.degree,
        })
    }

    async fn request(&self, app_code: &str, payload: &BeautifyRequest) -> Result<BeautifyResponse> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(AUTHORIZATION, format!("APPCODE {}", app_code))
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                let kind = if e.is_timeout() { "timed out" } else { "failed" };
                IdPhotoError::remote_enhancement(format!("Request to {} {}: {}", self.endpoint, kind, e))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(IdPhotoError::remote_enhancement(format!(
                "Provider answered HTTP {}",
                status
            )));
        }

        response.json::<BeautifyResponse>().await.map_err(|e| {
            IdPhotoError::remote_enhancement(format!("Malformed provider response: {}", e))
        })
    }
}

#[async_trait]
impl Enhancer for RemoteBeautifyEnhancer {
    fn name(&self) -> &'static str {
        "remote-a"
    }

    async fn enhance(&self, image: &RgbaImage, options: &EnhanceOptions) -> Result<RgbaImage> {
        let app_code = self.app_code.as_deref().ok_or_else(|| {
            IdPhotoError::capability_unavailable("enhancement:remote-a", "no app code configured")
        })?;

        let jpeg = OutputFormatHandler::encode(image, OutputFormat::Jpeg, UPLOAD_QUALITY)?;
        let payload = BeautifyRequest {
            image: ImageIOService::to_base64(&jpeg),
            degree: options.beautify_degree.unwrap_or(self.default_degree),
        };

        let start = instant::Instant::now();
        let reply = self.request(app_code, &payload).await?;
        log::debug!(
            "Remote beautifier answered in {:.0}ms",
            start.elapsed().as_secs_f64() * 1000.0
        );

        if !reply.success {
            return Err(IdPhotoError::remote_enhancement(format!(
                "Provider reported failure: {}",
                reply.message.as_deref().unwrap_or("no message")
            )));
        }
        let encoded = reply
            .data
            .and_then(|data| data.image)
            .ok_or_else(|| IdPhotoError::remote_enhancement("Provider response has no image"))?;

        let decoded = ImageIOService::decode_payload(&encoded).map_err(|e| {
            IdPhotoError::remote_enhancement(format!("Provider returned an unusable image: {}", e))
        })?;
        Ok(decoded.into_rgba8())
    }
}
