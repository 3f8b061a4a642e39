//! Configuration loading
//!
//! Sources, lowest priority first:
//! 1. built-in defaults
//! 2. a TOML file: the explicit path, else `SPROC_CONFIG_PATH`, else
//!    `./sproc.toml` when it exists
//! 3. `SPROC_*` environment variables, with `__` between nested keys
//!    (`SPROC_DATABASE__URL`, `SPROC_INTERPRETER__MAX_CALL_DEPTH`); a `.env`
//!    file is loaded first
//! 4. values set on the builder

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::interpreter::{DEFAULT_MAX_CALL_DEPTH, MAX_CALL_DEPTH_CEILING};

const ENV_PREFIX: &str = "SPROC";
const CONFIG_PATH_ENV: &str = "SPROC_CONFIG_PATH";
const DEFAULT_CONFIG_FILE: &str = "sproc.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub interpreter: InterpreterConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 20,
            min_connections: 2,
            acquire_timeout_secs: 10,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpreterConfig {
    pub max_call_depth: usize,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Run migrations when the postgres backend starts
    pub auto_migrate: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            auto_migrate: true,
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.storage.backend == StorageBackend::Postgres && self.database.url.is_none() {
            anyhow::bail!(
                "The postgres storage backend requires a database URL \
                 (set database.url or SPROC_DATABASE__URL)"
            );
        }
        if self.database.min_connections > self.database.max_connections {
            anyhow::bail!(
                "database.min_connections ({}) exceeds database.max_connections ({})",
                self.database.min_connections,
                self.database.max_connections
            );
        }
        if !(1..=MAX_CALL_DEPTH_CEILING).contains(&self.interpreter.max_call_depth) {
            anyhow::bail!(
                "interpreter.max_call_depth must be between 1 and {}, got {}",
                MAX_CALL_DEPTH_CEILING,
                self.interpreter.max_call_depth
            );
        }
        Ok(())
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to render configuration as TOML")
    }
}

/// Builder for loading a `Config`
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    database_url: Option<String>,
    config_path: Option<PathBuf>,
    backend: Option<StorageBackend>,
    skip_env: bool,
}

impl ConfigBuilder {
    /// Override the database URL
    pub fn database_url(mut self, url: Option<String>) -> Self {
        self.database_url = url;
        self
    }

    /// Load this file instead of searching for one
    pub fn config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    /// Override the storage backend
    pub fn backend(mut self, backend: Option<StorageBackend>) -> Self {
        self.backend = backend;
        self
    }

    /// Ignore the environment and `.env` (used by tests)
    pub fn without_env(mut self) -> Self {
        self.skip_env = true;
        self
    }

    pub fn build(self) -> Result<Config> {
        if !self.skip_env {
            dotenvy::dotenv().ok();
        }

        let mut builder = config::Config::builder().add_source(
            config::Config::try_from(&Config::default())
                .context("Failed to load default configuration")?,
        );

        if let Some(path) = self.resolve_path() {
            tracing::debug!(path = %path.display(), "loading config file");
            builder = builder.add_source(config::File::from(path.as_path()).required(true));
        }

        if !self.skip_env {
            builder = builder.add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );
        }

        builder = builder
            .set_override_option("database.url", self.database_url)
            .context("Failed to apply database URL override")?;
        if let Some(backend) = self.backend {
            let backend = match backend {
                StorageBackend::Memory => "memory",
                StorageBackend::Postgres => "postgres",
            };
            builder = builder
                .set_override("storage.backend", backend)
                .context("Failed to apply storage backend override")?;
        }

        let config: Config = builder
            .build()
            .context("Failed to load configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;

        config.validate()?;
        Ok(config)
    }

    fn resolve_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.config_path {
            return Some(path.clone());
        }
        if !self.skip_env {
            if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
                return Some(PathBuf::from(path));
            }
        }
        let default = Path::new(DEFAULT_CONFIG_FILE);
        default.exists().then(|| default.to_path_buf())
    }
}
