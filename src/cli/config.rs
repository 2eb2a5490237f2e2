//! Conversion of CLI arguments into a service configuration

use crate::cli::main_impl::Cli;
use crate::config::ServiceConfig;
use anyhow::{Context, Result};

pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Build the service configuration: file (if any), then environment, then flags
    pub(crate) fn from_cli(cli: &Cli) -> Result<ServiceConfig> {
        let config = match &cli.config {
            Some(path) => ServiceConfig::from_file(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
            None => ServiceConfig::default(),
        };

        let mut config = config
            .with_env_overrides()
            .context("Invalid configuration in environment")?;

        if let Some(dir) = &cli.model_dir {
            config.model_dir.clone_from(dir);
        }
        if let Some(provider) = &cli.execution_provider {
            config.execution_provider = provider
                .parse()
                .with_context(|| format!("Invalid execution provider '{}'", provider))?;
        }
        if cli.no_classical_fallback {
            config.classical_fallback = false;
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}
