use super::defaults::MIN_KDF_ITERATIONS;
use super::StepsConfig;
use crate::crypto::cipher::MAX_KDF_ITERATIONS;
use crate::crypto::{check_compliance, FipsAllowList};
use anyhow::Result;
use tracing::warn;

/// Validation errors for configuration.
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Validate a configuration object.
///
/// A non-FIPS default algorithm is only warned about, matching how the file
/// steps treat the same selection.
pub fn validate_config(config: &StepsConfig) -> Vec<ConfigValidationError> {
    let mut errors = Vec::new();

    if config.crypto.kdf_iterations < MIN_KDF_ITERATIONS {
        errors.push(ConfigValidationError {
            path: "crypto.kdfIterations".to_string(),
            message: format!("Must be at least {MIN_KDF_ITERATIONS}"),
        });
    } else if config.crypto.kdf_iterations > MAX_KDF_ITERATIONS {
        errors.push(ConfigValidationError {
            path: "crypto.kdfIterations".to_string(),
            message: format!("Must be at most {MAX_KDF_ITERATIONS}"),
        });
    }

    let finding = check_compliance(config.crypto.default_algorithm, &FipsAllowList);
    if !finding.compliant {
        warn!(
            "crypto.defaultAlgorithm '{}' is not FIPS compliant",
            finding.algorithm
        );
    }

    if config.database.busy_timeout_ms == 0 {
        warn!("database.busyTimeoutMs is 0; locked databases fail immediately");
    }

    errors
}

/// Validate configuration and return Result.
pub fn validate_config_object(config: &StepsConfig) -> Result<()> {
    let errors = validate_config(config);
    if errors.is_empty() {
        Ok(())
    } else {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        anyhow::bail!("Configuration validation failed:\n{}", messages.join("\n"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::SymmetricAlgorithm;

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&StepsConfig::default()).is_empty());
    }

    #[test]
    fn low_iteration_count_is_rejected() {
        let mut config = StepsConfig::default();
        config.crypto.kdf_iterations = 10;

        let errors = validate_config(&config);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "crypto.kdfIterations");

        let err = validate_config_object(&config).unwrap_err();
        assert!(err.to_string().contains("crypto.kdfIterations"));
    }

    #[test]
    fn excessive_iteration_count_is_rejected() {
        let mut config = StepsConfig::default();
        config.crypto.kdf_iterations = MAX_KDF_ITERATIONS + 1;
        assert_eq!(validate_config(&config)[0].path, "crypto.kdfIterations");
    }

    #[test]
    fn non_compliant_default_algorithm_only_warns() {
        let mut config = StepsConfig::default();
        config.crypto.default_algorithm = SymmetricAlgorithm::Des;
        assert!(validate_config_object(&config).is_ok());
    }
}
