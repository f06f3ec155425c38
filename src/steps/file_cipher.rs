//! Encrypt or decrypt a whole file with a key resolved from host inputs.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tracing::{debug, info};
use zeroize::Zeroizing;

use super::dispatch::dispatch_blocking;
use super::fault::{settle, FaultPolicy};
use super::{PendingOutputs, Step, StepContext, ValidationFinding};
use crate::config::CryptoConfig;
use crate::crypto::{
    check_compliance, CipherRequest, CipherService, ComplianceCheck, FipsAllowList,
    RustCryptoCipher, SymmetricAlgorithm,
};
use crate::error::StepError;
use crate::secrets::{require_input, resolve_key, SecretArgs, TextEncoding};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherDirection {
    Encrypt,
    Decrypt,
}

/// Outputs of a file step.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FileOutputs {
    /// Path that was written, absent when a failure was suppressed.
    pub output_file: Option<PathBuf>,
}

/// Reads `input_file_path`, transforms it in memory and writes the result to
/// `output_file_path`.
pub struct FileCipherStep {
    pub direction: CipherDirection,
    pub algorithm: SymmetricAlgorithm,
    pub input_file_path: Option<String>,
    pub output_file_path: Option<String>,
    pub key: SecretArgs,
    pub key_encoding: Option<TextEncoding>,
    pub overwrite: bool,
    pub continue_on_error: bool,
    cipher: Arc<dyn CipherService>,
    compliance: Arc<dyn ComplianceCheck>,
}

impl FileCipherStep {
    pub fn new(
        direction: CipherDirection,
        cipher: Arc<dyn CipherService>,
        compliance: Arc<dyn ComplianceCheck>,
    ) -> Self {
        Self {
            direction,
            algorithm: SymmetricAlgorithm::default(),
            input_file_path: None,
            output_file_path: None,
            key: SecretArgs::none(),
            key_encoding: Some(TextEncoding::default()),
            overwrite: false,
            continue_on_error: false,
            cipher,
            compliance,
        }
    }

    /// Step wired to the RustCrypto cipher and the FIPS allow-list, with the
    /// configured defaults.
    pub fn from_config(direction: CipherDirection, config: &CryptoConfig) -> Self {
        let mut step = Self::new(
            direction,
            Arc::new(RustCryptoCipher::new(config.kdf_iterations)),
            Arc::new(FipsAllowList),
        );
        step.algorithm = config.default_algorithm;
        step.key_encoding = Some(config.default_encoding);
        step
    }

    pub fn encrypt(config: &CryptoConfig) -> Self {
        Self::from_config(CipherDirection::Encrypt, config)
    }

    pub fn decrypt(config: &CryptoConfig) -> Self {
        Self::from_config(CipherDirection::Decrypt, config)
    }

    pub fn with_paths(mut self, input: impl Into<String>, output: impl Into<String>) -> Self {
        self.input_file_path = Some(input.into());
        self.output_file_path = Some(output.into());
        self
    }

    pub fn with_key(mut self, key: SecretArgs) -> Self {
        self.key = key;
        self
    }

    pub fn with_algorithm(mut self, algorithm: SymmetricAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn with_continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }

    async fn run(&self, ctx: &StepContext) -> Result<PathBuf, StepError> {
        let input = PathBuf::from(require_input(self.input_file_path.as_deref(), "input file path")?);
        let output =
            PathBuf::from(require_input(self.output_file_path.as_deref(), "output file path")?);
        let key = resolve_key(self.key.input("key")?, self.key_encoding, "key")?;

        let cipher = Arc::clone(&self.cipher);
        let algorithm = self.algorithm;
        let direction = self.direction;
        let overwrite = self.overwrite;

        dispatch_blocking(ctx, move || {
            transform_file(&input, &output, overwrite, |payload| {
                let request = CipherRequest {
                    algorithm,
                    payload,
                    key: &key,
                };
                let transformed = match direction {
                    CipherDirection::Encrypt => cipher.encrypt(request)?,
                    CipherDirection::Decrypt => cipher.decrypt(request)?,
                };
                Ok(transformed)
            })
        })
        .await
    }
}

impl fmt::Debug for FileCipherStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileCipherStep")
            .field("direction", &self.direction)
            .field("algorithm", &self.algorithm)
            .field("input_file_path", &self.input_file_path)
            .field("output_file_path", &self.output_file_path)
            .field("key_encoding", &self.key_encoding)
            .field("overwrite", &self.overwrite)
            .field("continue_on_error", &self.continue_on_error)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Step for FileCipherStep {
    type Outputs = FileOutputs;

    fn name(&self) -> &'static str {
        match self.direction {
            CipherDirection::Encrypt => "encrypt_file",
            CipherDirection::Decrypt => "decrypt_file",
        }
    }

    fn validate(&self) -> Vec<ValidationFinding> {
        let finding = check_compliance(self.algorithm, self.compliance.as_ref());
        if finding.compliant {
            return Vec::new();
        }
        vec![ValidationFinding::warning(
            "algorithm",
            format!("{} is not a FIPS compliant algorithm", finding.algorithm),
        )]
    }

    async fn execute(&self, ctx: &StepContext) -> Result<PendingOutputs<FileOutputs>, StepError> {
        let result = self.run(ctx).await;
        if let Ok(path) = &result {
            info!(
                step = self.name(),
                algorithm = %self.algorithm,
                output = %path.display(),
                "file written"
            );
        }
        settle(
            self.name(),
            FaultPolicy::from_flag(self.continue_on_error),
            result,
            |outputs: &mut FileOutputs, path| outputs.output_file = Some(path),
        )
    }
}

/// Read `input`, transform it, and place the result at `output`.
///
/// The result is staged in a temporary file beside `output` and renamed into
/// place, so an existing destination is either fully replaced or untouched.
fn transform_file(
    input: &Path,
    output: &Path,
    overwrite: bool,
    transform: impl FnOnce(&[u8]) -> Result<Vec<u8>, StepError>,
) -> Result<PathBuf, StepError> {
    if !input.exists() {
        return Err(StepError::InputNotFound(input.to_path_buf()));
    }
    if !overwrite && output.exists() {
        return Err(StepError::OutputExists(output.to_path_buf()));
    }

    let payload = Zeroizing::new(std::fs::read(input).map_err(|e| StepError::io(input, e))?);
    let transformed = Zeroizing::new(transform(&payload)?);
    debug!(bytes_in = payload.len(), bytes_out = transformed.len(), "transformed payload");

    let dir = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut staged = NamedTempFile::new_in(dir).map_err(|e| StepError::io(dir, e))?;
    staged
        .write_all(&transformed)
        .and_then(|_| staged.as_file().sync_all())
        .map_err(|e| StepError::io(staged.path(), e))?;

    if overwrite {
        staged
            .persist(output)
            .map_err(|e| StepError::io(output, e.error))?;
    } else {
        staged.persist_noclobber(output).map_err(|e| {
            if e.error.kind() == std::io::ErrorKind::AlreadyExists {
                StepError::OutputExists(output.to_path_buf())
            } else {
                StepError::io(output, e.error)
            }
        })?;
    }

    Ok(output.to_path_buf())
}
