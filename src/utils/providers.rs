//! Execution provider availability checks

use crate::config::ExecutionProvider;

/// Information about an execution provider
#[derive(Debug, Clone, serde::Serialize)]
pub struct ProviderInfo {
    pub name: String,
    pub execution_provider: ExecutionProvider,
    pub available: bool,
    pub description: String,
}

/// Utility for checking hardware acceleration
pub struct ExecutionProviderManager;

impl ExecutionProviderManager {
    /// List every execution provider with its availability
    #[must_use]
    pub fn list_providers() -> Vec<ProviderInfo> {
        vec![
            ProviderInfo {
                name: "CPU".to_string(),
                execution_provider: ExecutionProvider::Cpu,
                available: true,
                description: "Always available, uses CPU for inference".to_string(),
            },
            ProviderInfo {
                name: "CUDA".to_string(),
                execution_provider: ExecutionProvider::Cuda,
                available: Self::is_available(ExecutionProvider::Cuda),
                description: "NVIDIA GPU acceleration (requires CUDA toolkit and compatible GPU)"
                    .to_string(),
            },
            ProviderInfo {
                name: "CoreML".to_string(),
                execution_provider: ExecutionProvider::CoreMl,
                available: Self::is_available(ExecutionProvider::CoreMl),
                description: "Apple Silicon GPU acceleration (macOS only)".to_string(),
            },
        ]
    }

    /// Whether `provider` can run in this build on this machine
    #[must_use]
    pub fn is_available(provider: ExecutionProvider) -> bool {
        match provider {
            ExecutionProvider::Cpu => true,
            ExecutionProvider::Auto => {
                Self::is_available(ExecutionProvider::Cuda)
                    || Self::is_available(ExecutionProvider::CoreMl)
            },
            ExecutionProvider::Cuda | ExecutionProvider::CoreMl => Self::probe(provider),
        }
    }

    /// Whether the configured provider resolves to hardware acceleration
    #[must_use]
    pub fn is_accelerated(provider: ExecutionProvider) -> bool {
        match provider {
            ExecutionProvider::Cpu => false,
            other => Self::is_available(other),
        }
    }

    #[cfg(feature = "onnx")]
    fn probe(provider: ExecutionProvider) -> bool {
        use ort::execution_providers::{
            CUDAExecutionProvider, CoreMLExecutionProvider, ExecutionProvider as OrtExecutionProvider,
        };

        match provider {
            ExecutionProvider::Cuda => {
                OrtExecutionProvider::is_available(&CUDAExecutionProvider::default())
                    .unwrap_or(false)
            },
            ExecutionProvider::CoreMl => {
                OrtExecutionProvider::is_available(&CoreMLExecutionProvider::default())
                    .unwrap_or(false)
            },
            ExecutionProvider::Cpu | ExecutionProvider::Auto => false,
        }
    }

    #[cfg(not(feature = "onnx"))]
    fn probe(provider: ExecutionProvider) -> bool {
        log::trace!("{} provider unavailable: built without the onnx feature", provider);
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_always_available() {
        assert!(ExecutionProviderManager::is_available(ExecutionProvider::Cpu));
        assert!(!ExecutionProviderManager::is_accelerated(ExecutionProvider::Cpu));
    }

    #[test]
    fn test_list_providers() {
        let providers = ExecutionProviderManager::list_providers();
        assert_eq!(providers.len(), 3);
        assert!(providers
            .iter()
            .any(|p| p.execution_provider == ExecutionProvider::Cpu && p.available));
    }

    #[cfg(not(feature = "onnx"))]
    #[test]
    fn test_no_acceleration_without_onnx() {
        assert!(!ExecutionProviderManager::is_available(ExecutionProvider::Cuda));
        assert!(!ExecutionProviderManager::is_accelerated(ExecutionProvider::Auto));
    }
}
