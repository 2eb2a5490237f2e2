//! Configuration types for ID photo processing

use crate::error::{IdPhotoError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable overriding [`ServiceConfig::model_dir`]
pub const ENV_MODEL_DIR: &str = "IDPHOTO_MODEL_DIR";
/// Environment variable overriding [`ServiceConfig::execution_provider`]
pub const ENV_EXECUTION_PROVIDER: &str = "IDPHOTO_EXECUTION_PROVIDER";
/// Environment variable overriding [`RemoteProviderConfig::endpoint`]
pub const ENV_REMOTE_ENDPOINT: &str = "IDPHOTO_REMOTE_ENDPOINT";
/// Environment variable overriding [`RemoteProviderConfig::app_code`]
pub const ENV_REMOTE_APPCODE: &str = "IDPHOTO_REMOTE_APPCODE";
/// Environment variable overriding [`TencentCredentials::secret_id`]
pub const ENV_TENCENT_SECRET_ID: &str = "IDPHOTO_TENCENT_SECRET_ID";
/// Environment variable overriding [`TencentCredentials::secret_key`]
pub const ENV_TENCENT_SECRET_KEY: &str = "IDPHOTO_TENCENT_SECRET_KEY";

const DEFAULT_REMOTE_ENDPOINT: &str = "https://vision.aliyuncs.com/facebody/v1/beautifyBody";
const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 30;
const DEFAULT_BEAUTIFY_DEGREE: f32 = 0.7;

/// Execution provider options for the learned segmentation model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionProvider {
    /// Auto-detect best available provider (CUDA > `CoreML` > CPU)
    #[default]
    Auto,
    /// CPU execution (always available)
    Cpu,
    /// NVIDIA CUDA GPU acceleration
    Cuda,
    /// Apple Silicon acceleration
    CoreMl,
}

impl std::fmt::Display for ExecutionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Cpu => write!(f, "cpu"),
            Self::Cuda => write!(f, "cuda"),
            Self::CoreMl => write!(f, "coreml"),
        }
    }
}

impl FromStr for ExecutionProvider {
    type Err = IdPhotoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "cpu" => Ok(Self::Cpu),
            "cuda" | "gpu" => Ok(Self::Cuda),
            "coreml" => Ok(Self::CoreMl),
            other => Err(IdPhotoError::invalid_config(format!(
                "Unknown execution provider '{}' (expected auto, cpu, cuda or coreml)",
                other
            ))),
        }
    }
}

/// Output image format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JPEG (opaque RGB, lossy, honours quality)
    #[default]
    Jpeg,
    /// PNG (RGBA, lossless)
    Png,
}

impl OutputFormat {
    /// Subtype used in `data:image/<subtype>;base64,` URLs
    #[must_use]
    pub fn mime_subtype(self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mime_subtype())
    }
}

impl FromStr for OutputFormat {
    type Err = IdPhotoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            other => Err(IdPhotoError::encoding(format!(
                "Unsupported output format '{}' (expected jpeg or png)",
                other
            ))),
        }
    }
}

/// Settings for the remote beautification provider (`remote-a`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteProviderConfig {
    /// HTTP endpoint receiving the beautify request
    pub endpoint: String,
    /// Application code sent as `Authorization: APPCODE <code>`
    pub app_code: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Default beautify degree when the request does not carry one
    pub degree: f32,
}

impl Default for RemoteProviderConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_REMOTE_ENDPOINT.to_string(),
            app_code: None,
            timeout_secs: DEFAULT_REMOTE_TIMEOUT_SECS,
            degree: DEFAULT_BEAUTIFY_DEGREE,
        }
    }
}

impl RemoteProviderConfig {
    /// Request timeout as a `Duration`
    #[must_use]
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }
}

/// Credentials for the `remote-b` provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TencentCredentials {
    pub secret_id: Option<String>,
    pub secret_key: Option<String>,
}

impl TencentCredentials {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.secret_id.as_deref().is_some_and(|s| !s.is_empty())
            && self.secret_key.as_deref().is_some_and(|s| !s.is_empty())
    }
}

/// Process-wide configuration, created once at startup and passed to the processor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Directory holding the learned segmentation model files
    pub model_dir: PathBuf,

    /// Execution provider for the learned model
    pub execution_provider: ExecutionProvider,

    /// Number of intra-op threads for inference (0 = auto)
    pub intra_threads: usize,

    /// Use the classical segmenter when the learned model fails
    pub classical_fallback: bool,

    /// Remote beautification provider settings
    pub remote: RemoteProviderConfig,

    /// Credentials for the second remote provider
    pub tencent: TencentCredentials,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            model_dir: Self::default_model_dir(),
            execution_provider: ExecutionProvider::default(),
            intra_threads: 0,
            classical_fallback: true,
            remote: RemoteProviderConfig::default(),
            tencent: TencentCredentials::default(),
        }
    }
}

impl ServiceConfig {
    /// Create a new configuration builder
    ///
    /// # Examples
    ///
    /// ```rust
    /// use idphoto::{ExecutionProvider, ServiceConfig};
    ///
    /// let config = ServiceConfig::builder()
    ///     .execution_provider(ExecutionProvider::Cpu)
    ///     .remote_timeout_secs(10)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.remote.timeout_secs, 10);
    /// ```
    #[must_use]
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder::default()
    }

    /// Default model location: `<cache dir>/idphoto/models`
    #[must_use]
    pub fn default_model_dir() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("idphoto")
            .join("models")
    }

    /// Load configuration from a JSON file; missing fields take their defaults
    ///
    /// # Errors
    /// - The file cannot be read
    /// - The file is not valid JSON for this structure
    /// - The loaded values fail [`ServiceConfig::validate`]
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| IdPhotoError::file_io_error("read configuration file", path, &e))?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| {
            IdPhotoError::invalid_config(format!(
                "Failed to parse configuration file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        log::debug!("Loaded service configuration from {}", path.display());
        Ok(config)
    }

    /// Apply `IDPHOTO_*` environment variable overrides
    ///
    /// # Errors
    /// - `IDPHOTO_EXECUTION_PROVIDER` holds an unknown provider name
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup (used by tests and embedders)
    ///
    /// # Errors
    /// - The execution provider override holds an unknown provider name
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_MODEL_DIR) {
            self.model_dir = PathBuf::from(dir);
        }
        if let Some(provider) = lookup(ENV_EXECUTION_PROVIDER) {
            self.execution_provider = provider.parse()?;
        }
        if let Some(endpoint) = lookup(ENV_REMOTE_ENDPOINT) {
            self.remote.endpoint = endpoint;
        }
        if let Some(code) = lookup(ENV_REMOTE_APPCODE) {
            self.remote.app_code = Some(code);
        }
        if let Some(id) = lookup(ENV_TENCENT_SECRET_ID) {
            self.tencent.secret_id = Some(id);
        }
        if let Some(key) = lookup(ENV_TENCENT_SECRET_KEY) {
            self.tencent.secret_key = Some(key);
        }
        Ok(self)
    }

    /// Validate all configuration parameters
    ///
    /// # Errors
    /// - Remote timeout of zero seconds
    /// - Empty remote endpoint
    /// - Beautify degree outside 0.0-1.0
    pub fn validate(&self) -> Result<()> {
        if self.remote.timeout_secs == 0 {
            return Err(IdPhotoError::config_value_error(
                "remote timeout",
                self.remote.timeout_secs,
                "1-600 seconds",
                Some(DEFAULT_REMOTE_TIMEOUT_SECS),
            ));
        }

        if self.remote.endpoint.trim().is_empty() {
            return Err(IdPhotoError::invalid_config(
                "Remote enhancement endpoint must not be empty",
            ));
        }

        if !(0.0..=1.0).contains(&self.remote.degree) {
            return Err(IdPhotoError::config_value_error(
                "beautify degree",
                self.remote.degree,
                "0.0-1.0",
                Some(DEFAULT_BEAUTIFY_DEGREE),
            ));
        }

        Ok(())
    }
}

/// Builder for `ServiceConfig`
#[derive(Debug, Default)]
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl ServiceConfigBuilder {
    #[must_use]
    pub fn model_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.config.model_dir = dir.into();
        self
    }

    #[must_use]
    pub fn execution_provider(mut self, provider: ExecutionProvider) -> Self {
        self.config.execution_provider = provider;
        self
    }

    #[must_use]
    pub fn intra_threads(mut self, threads: usize) -> Self {
        self.config.intra_threads = threads;
        self
    }

    #[must_use]
    pub fn classical_fallback(mut self, enabled: bool) -> Self {
        self.config.classical_fallback = enabled;
        self
    }

    #[must_use]
    pub fn remote_endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.config.remote.endpoint = endpoint.into();
        self
    }

    #[must_use]
    pub fn remote_app_code<S: Into<String>>(mut self, code: S) -> Self {
        self.config.remote.app_code = Some(code.into());
        self
    }

    #[must_use]
    pub fn remote_timeout_secs(mut self, secs: u64) -> Self {
        self.config.remote.timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn tencent_credentials<S: Into<String>>(mut self, secret_id: S, secret_key: S) -> Self {
        self.config.tencent = TencentCredentials {
            secret_id: Some(secret_id.into()),
            secret_key: Some(secret_key.into()),
        };
        self
    }

    /// Build the configuration
    ///
    /// # Errors
    /// - Any [`ServiceConfig::validate`] failure
    pub fn build(self) -> Result<ServiceConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.execution_provider, ExecutionProvider::Auto);
        assert_eq!(config.remote.timeout_secs, 30);
        assert!(config.classical_fallback);
        assert!(config.model_dir.ends_with("idphoto/models"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("jpeg".parse::<OutputFormat>().unwrap(), OutputFormat::Jpeg);
        assert_eq!("JPG".parse::<OutputFormat>().unwrap(), OutputFormat::Jpeg);
        assert_eq!("png".parse::<OutputFormat>().unwrap(), OutputFormat::Png);

        let err = "tiff".parse::<OutputFormat>().unwrap_err();
        assert!(matches!(err, IdPhotoError::Encoding(_)));
    }

    #[test]
    fn test_execution_provider_parsing() {
        assert_eq!(
            "CoreML".parse::<ExecutionProvider>().unwrap(),
            ExecutionProvider::CoreMl
        );
        assert_eq!(
            "gpu".parse::<ExecutionProvider>().unwrap(),
            ExecutionProvider::Cuda
        );
        assert!("tpu".parse::<ExecutionProvider>().is_err());
    }

    #[test]
    fn test_builder_validation() {
        let err = ServiceConfig::builder()
            .remote_timeout_secs(0)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("remote timeout"));

        let err = ServiceConfig::builder()
            .remote_endpoint("  ")
            .build()
            .unwrap_err();
        assert!(matches!(err, IdPhotoError::InvalidConfig(_)));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            (ENV_MODEL_DIR, "/opt/models"),
            (ENV_EXECUTION_PROVIDER, "cpu"),
            (ENV_REMOTE_APPCODE, "secret"),
            (ENV_TENCENT_SECRET_ID, "id"),
            (ENV_TENCENT_SECRET_KEY, "key"),
        ]
        .into_iter()
        .collect();

        let config = ServiceConfig::default()
            .with_overrides_from(|key| vars.get(key).map(ToString::to_string))
            .unwrap();

        assert_eq!(config.model_dir, PathBuf::from("/opt/models"));
        assert_eq!(config.execution_provider, ExecutionProvider::Cpu);
        assert_eq!(config.remote.app_code.as_deref(), Some("secret"));
        assert!(config.tencent.is_complete());
    }

    #[test]
    fn test_from_file_with_partial_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"model_dir": "/srv/models", "execution_provider": "cuda", "remote": {{"timeout_secs": 5}}}}"#
        )
        .unwrap();

        let config = ServiceConfig::from_file(file.path()).unwrap();
        assert_eq!(config.model_dir, PathBuf::from("/srv/models"));
        assert_eq!(config.execution_provider, ExecutionProvider::Cuda);
        assert_eq!(config.remote.timeout_secs, 5);
        assert_eq!(config.remote.endpoint, DEFAULT_REMOTE_ENDPOINT);
    }

    #[test]
    fn test_from_file_errors() {
        let missing = ServiceConfig::from_file("/definitely/not/here.json").unwrap_err();
        assert!(matches!(missing, IdPhotoError::Io(_)));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let invalid = ServiceConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(invalid, IdPhotoError::InvalidConfig(_)));
    }
}
