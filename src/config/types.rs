use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::defaults::{DEFAULT_BUSY_TIMEOUT_MS, DEFAULT_LOG_FILTER_TARGET};
use crate::crypto::cipher::DEFAULT_KDF_ITERATIONS;
use crate::crypto::SymmetricAlgorithm;
use crate::secrets::TextEncoding;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoggingLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LoggingLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LoggingLevel::Error => "error",
            LoggingLevel::Warn => "warn",
            LoggingLevel::Info => "info",
            LoggingLevel::Debug => "debug",
            LoggingLevel::Trace => "trace",
        }
    }

    /// `EnvFilter` directive scoping this level to the crate's own events.
    pub fn directive(self) -> String {
        format!("{DEFAULT_LOG_FILTER_TARGET}={}", self.as_str())
    }
}

impl FromStr for LoggingLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(LoggingLevel::Error),
            "warn" | "warning" => Ok(LoggingLevel::Warn),
            "info" => Ok(LoggingLevel::Info),
            "debug" => Ok(LoggingLevel::Debug),
            "trace" => Ok(LoggingLevel::Trace),
            other => Err(format!("unknown logging level '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingConfig {
    pub level: LoggingLevel,
    /// Emit newline-delimited JSON instead of human-readable lines.
    pub json: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CryptoConfig {
    /// Algorithm used when a file step is not given one explicitly.
    pub default_algorithm: SymmetricAlgorithm,
    /// Encoding used to turn key text into key bytes.
    pub default_encoding: TextEncoding,
    /// PBKDF2 rounds applied to key material.
    pub kdf_iterations: u32,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            default_algorithm: SymmetricAlgorithm::default(),
            default_encoding: TextEncoding::default(),
            kdf_iterations: DEFAULT_KDF_ITERATIONS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatabaseConfig {
    /// How long the SQLite driver waits on a locked database.
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}
