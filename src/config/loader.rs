//! Configuration Loader
//!
//! Environment-aware loading: base file, environment override file, then
//! `GEOFENCER__` environment variables, merged by the `config` crate.

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ::config::{Config, Environment, File, FileFormat};
use tracing::{debug, info};

use super::error::ConfigResult;
use super::GeofencerConfig;
use crate::constants::CONFIG_ENV_PREFIX;

const BASE_CONFIG_NAME: &str = "geofencer";

/// Loaded, validated configuration plus where it came from
#[derive(Debug)]
pub struct ConfigManager {
    config: GeofencerConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment.
    /// Useful for tests that must not touch process-wide variables.
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        Self::load_with_overrides(config_dir, environment, None)
    }

    /// Same as [`Self::load_from_directory_with_env`] but reads environment
    /// overrides from `overrides` instead of the process environment
    pub fn load_with_overrides(
        config_dir: Option<PathBuf>,
        environment: &str,
        overrides: Option<HashMap<String, String>>,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(Self::default_config_directory);

        debug!(
            "Loading configuration for environment '{}' from directory: {}",
            environment,
            config_directory.display()
        );

        let config = Self::build_config(&config_directory, environment, overrides)?;
        config.validate()?;

        info!(
            environment = environment,
            database_url = %config.store.database_url,
            command_timeout_ms = config.executor.command_timeout_ms,
            "⚙️ CONFIG: Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    /// Wrap an already-built configuration, validating it first
    pub fn from_config(config: GeofencerConfig, environment: &str) -> ConfigResult<Arc<Self>> {
        config.validate()?;
        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory: Self::default_config_directory(),
        }))
    }

    pub fn config(&self) -> &GeofencerConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    /// GEOFENCER_ENV || APP_ENV || 'development'
    pub fn detect_environment() -> String {
        env::var("GEOFENCER_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
    }

    fn default_config_directory() -> PathBuf {
        PathBuf::from("config")
    }

    fn build_config(
        config_directory: &Path,
        environment: &str,
        overrides: Option<HashMap<String, String>>,
    ) -> ConfigResult<GeofencerConfig> {
        let base = config_directory.join(format!("{BASE_CONFIG_NAME}.toml"));
        let env_specific = config_directory.join(format!("{BASE_CONFIG_NAME}.{environment}.toml"));

        debug!(
            base = %base.display(),
            base_exists = base.exists(),
            env_specific = %env_specific.display(),
            env_specific_exists = env_specific.exists(),
            "Resolving configuration sources"
        );

        let settings = Config::builder()
            .add_source(File::new(&base.to_string_lossy(), FileFormat::Toml).required(false))
            .add_source(
                File::new(&env_specific.to_string_lossy(), FileFormat::Toml).required(false),
            )
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .source(overrides),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
