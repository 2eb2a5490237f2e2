//! Cosmetic enhancement
//!
//! A method name selects one of several strategies behind the [`Enhancer`] capability.
//! Any strategy that is unavailable or fails falls back to the local [`BasicEnhancer`],
//! so enhancement never fails a request.

pub mod basic;
pub mod remote;

pub use basic::BasicEnhancer;
pub use remote::RemoteBeautifyEnhancer;

use crate::{
    config::ServiceConfig,
    error::{IdPhotoError, Result},
};
use async_trait::async_trait;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Enhancement strategy selector
///
/// Unknown names map to [`EnhanceMethod::Basic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EnhanceMethod {
    /// Local adjustment chain
    #[default]
    Basic,
    /// Remote beautification service (`aliyun`)
    RemoteA,
    /// Second remote provider (`tencent`)
    RemoteB,
    /// Local learned beautification model
    LocalModel,
}

impl EnhanceMethod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::RemoteA => "remote-a",
            Self::RemoteB => "remote-b",
            Self::LocalModel => "local-model",
        }
    }
}

impl From<&str> for EnhanceMethod {
    fn from(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "remote-a" | "aliyun" => Self::RemoteA,
            "remote-b" | "tencent" => Self::RemoteB,
            "local-model" | "local" => Self::LocalModel,
            "basic" => Self::Basic,
            other => {
                log::debug!("Unknown enhancement method '{}', using basic", other);
                Self::Basic
            },
        }
    }
}

impl From<String> for EnhanceMethod {
    fn from(name: String) -> Self {
        Self::from(name.as_str())
    }
}

impl From<EnhanceMethod> for String {
    fn from(method: EnhanceMethod) -> Self {
        method.as_str().to_string()
    }
}

impl std::fmt::Display for EnhanceMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_true() -> bool {
    true
}
fn default_brightness() -> f32 {
    1.1
}
fn default_contrast() -> f32 {
    1.2
}
fn default_saturation() -> f32 {
    1.1
}
fn default_sharpness() -> f32 {
    1.2
}
fn default_format() -> String {
    "jpeg".to_string()
}

/// Enhancement parameters as they arrive in a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhanceOptions {
    #[serde(default)]
    pub method: EnhanceMethod,
    /// 5x5 smoothing pass before the factor adjustments
    #[serde(default = "default_true")]
    pub skin_smooth: bool,
    #[serde(default = "default_brightness")]
    pub brightness: f32,
    #[serde(default = "default_contrast")]
    pub contrast: f32,
    #[serde(default = "default_saturation")]
    pub saturation: f32,
    #[serde(default = "default_sharpness")]
    pub sharpness: f32,
    /// Strength forwarded to the remote beautifier; the configured default when absent
    #[serde(default)]
    pub beautify_degree: Option<f32>,
    /// Output format of the standalone enhancement request
    #[serde(default = "default_format")]
    pub format: String,
}

impl Default for EnhanceOptions {
    fn default() -> Self {
        Self {
            method: EnhanceMethod::Basic,
            skin_smooth: true,
            brightness: default_brightness(),
            contrast: default_contrast(),
            saturation: default_saturation(),
            sharpness: default_sharpness(),
            beautify_degree: None,
            format: default_format(),
        }
    }
}

/// Capability shared by every enhancement strategy
#[async_trait]
pub trait Enhancer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Enhance `image`, keeping its dimensions
    ///
    /// # Errors
    /// - The strategy is unavailable or failed
    async fn enhance(&self, image: &RgbaImage, options: &EnhanceOptions) -> Result<RgbaImage>;
}

/// Strategy that exists in the contract but is not provided by this build
#[derive(Debug, Clone)]
pub struct UnavailableEnhancer {
    name: &'static str,
    reason: String,
}

impl UnavailableEnhancer {
    #[must_use]
    pub fn new<S: Into<String>>(name: &'static str, reason: S) -> Self {
        Self {
            name,
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl Enhancer for UnavailableEnhancer {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn enhance(&self, _image: &RgbaImage, _options: &EnhanceOptions) -> Result<RgbaImage> {
        Err(IdPhotoError::capability_unavailable(
            format!("enhancement:{}", self.name),
            self.reason.clone(),
        ))
    }
}

/// Enhanced image and the strategy that actually produced it
#[derive(Debug, Clone)]
pub struct EnhanceOutcome {
    pub image: RgbaImage,
    pub method: EnhanceMethod,
}

/// Method-to-strategy table with fallback to the basic chain
pub struct EnhancementDispatcher {
    basic: BasicEnhancer,
    remote_a: Box<dyn Enhancer>,
    remote_b: Box<dyn Enhancer>,
    local_model: Box<dyn Enhancer>,
}

impl EnhancementDispatcher {
    /// Build the strategy table from the service configuration
    #[must_use]
    pub fn new(config: &ServiceConfig) -> Self {
        let remote_a: Box<dyn Enhancer> = match RemoteBeautifyEnhancer::new(&config.remote) {
            Ok(enhancer) => Box::new(enhancer),
            Err(e) => {
                log::warn!("Remote beautifier disabled: {}", e);
                Box::new(UnavailableEnhancer::new("remote-a", e.to_string()))
            },
        };

        let remote_b_reason = if config.tencent.is_complete() {
            "provider integration not available in this build"
        } else {
            "credentials not configured"
        };

        Self {
            basic: BasicEnhancer,
            remote_a,
            remote_b: Box::new(UnavailableEnhancer::new("remote-b", remote_b_reason)),
            local_model: Box::new(UnavailableEnhancer::new(
                "local-model",
                "no local beautification model installed",
            )),
        }
    }

    /// Replace the strategy registered for `method`; `Basic` cannot be replaced
    #[must_use]
    pub fn with_strategy(mut self, method: EnhanceMethod, enhancer: Box<dyn Enhancer>) -> Self {
        match method {
            EnhanceMethod::Basic => log::warn!("The basic enhancer cannot be replaced"),
            EnhanceMethod::RemoteA => self.remote_a = enhancer,
            EnhanceMethod::RemoteB => self.remote_b = enhancer,
            EnhanceMethod::LocalModel => self.local_model = enhancer,
        }
        self
    }

    fn strategy(&self, method: EnhanceMethod) -> &dyn Enhancer {
        match method {
            EnhanceMethod::Basic => &self.basic,
            EnhanceMethod::RemoteA => self.remote_a.as_ref(),
            EnhanceMethod::RemoteB => self.remote_b.as_ref(),
            EnhanceMethod::LocalModel => self.local_model.as_ref(),
        }
    }

    /// Enhance with the requested method, falling back to the basic chain; never fails
    #[instrument(skip(self, image, options), fields(method = %options.method))]
    pub async fn enhance(&self, image: &RgbaImage, options: &EnhanceOptions) -> EnhanceOutcome {
        if options.method != EnhanceMethod::Basic {
            let strategy = self.strategy(options.method);
            match strategy.enhance(image, options).await {
                Ok(enhanced) if enhanced.dimensions() == image.dimensions() => {
                    return EnhanceOutcome {
                        image: enhanced,
                        method: options.method,
                    };
                },
                Ok(enhanced) => log::warn!(
                    "{} returned {}x{} for a {}x{} image, using basic",
                    strategy.name(),
                    enhanced.width(),
                    enhanced.height(),
                    image.width(),
                    image.height()
                ),
                Err(IdPhotoError::CapabilityUnavailable { capability, reason }) => {
                    log::info!("{} unavailable ({}), using basic", capability, reason);
                },
                Err(e) => log::warn!("{} failed, using basic: {}", strategy.name(), e),
            }
        }

        EnhanceOutcome {
            image: self.basic.apply(image, options),
            method: EnhanceMethod::Basic,
        }
    }
}

impl std::fmt::Debug for EnhancementDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnhancementDispatcher")
            .field("remote_a", &self.remote_a.name())
            .field("remote_b", &self.remote_b.name())
            .field("local_model", &self.local_model.name())
            .finish()
    }
}
