mod defaults;
mod io;
mod types;
mod validation;

pub use defaults::*;
pub use io::*;
pub use types::*;
pub use validation::*;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Top-level stepvault configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepsConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub crypto: CryptoConfig,
    #[serde(default)]
    pub database: DatabaseConfig,

    /// File the configuration was read from, if any.
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl StepsConfig {
    /// Load configuration from file, environment, and defaults.
    ///
    /// An explicit `path` must exist; otherwise the standard locations are
    /// probed and defaults are used when nothing is found.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let config_path = match path {
            Some(explicit) => {
                let explicit = PathBuf::from(explicit);
                if !explicit.exists() {
                    anyhow::bail!("Config file '{}' does not exist", explicit.display());
                }
                Some(explicit)
            }
            None => find_config_file(),
        };

        let mut config = match config_path {
            Some(config_path) => {
                info!("Loading config from {}", config_path.display());
                let mut config = read_config_file(&config_path)?;
                config.source_path = Some(config_path);
                config
            }
            None => {
                info!("No config file found, using defaults");
                StepsConfig::default()
            }
        };

        config.apply_env_overrides();

        Ok(config)
    }

    /// Load configuration and reject it when [`validate_config`] reports
    /// errors. Used before any step runs.
    pub fn load_validated(path: Option<&str>) -> Result<Self> {
        let config = Self::load(path)?;
        validate_config_object(&config)?;
        Ok(config)
    }

    /// Write default configuration to a file, refusing to clobber one.
    pub fn write_default(path: &str) -> Result<()> {
        let path = Path::new(path);
        if path.exists() {
            anyhow::bail!("Config file '{}' already exists", path.display());
        }
        write_config_file(path, &StepsConfig::default())
    }

    /// Apply environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(level) = lookup("STEPVAULT_LOG_LEVEL") {
            match level.parse() {
                Ok(level) => self.logging.level = level,
                Err(e) => warn!("Ignoring STEPVAULT_LOG_LEVEL: {e}"),
            }
        }

        if let Some(iterations) = lookup("STEPVAULT_KDF_ITERATIONS") {
            match iterations.trim().parse() {
                Ok(iterations) => self.crypto.kdf_iterations = iterations,
                Err(_) => warn!("Ignoring STEPVAULT_KDF_ITERATIONS: not a number"),
            }
        }

        if let Some(algorithm) = lookup("STEPVAULT_DEFAULT_ALGORITHM") {
            match algorithm.parse() {
                Ok(algorithm) => self.crypto.default_algorithm = algorithm,
                Err(e) => warn!("Ignoring STEPVAULT_DEFAULT_ALGORITHM: {e}"),
            }
        }

        if let Some(timeout) = lookup("STEPVAULT_DB_BUSY_TIMEOUT_MS") {
            match timeout.trim().parse() {
                Ok(timeout) => self.database.busy_timeout_ms = timeout,
                Err(_) => warn!("Ignoring STEPVAULT_DB_BUSY_TIMEOUT_MS: not a number"),
            }
        }
    }
}

/// Find the configuration file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    for candidate in CONFIG_FILE_CANDIDATES {
        let path = PathBuf::from(candidate);
        if path.exists() {
            return Some(path);
        }
    }

    // Check home directory
    if let Some(home) = dirs::home_dir() {
        let home_config = home.join(".stepvault").join("config.json");
        if home_config.exists() {
            return Some(home_config);
        }
    }

    None
}
