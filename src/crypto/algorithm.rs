use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Symmetric algorithms a file step can be configured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SymmetricAlgorithm {
    /// AES-256 in Galois/Counter mode (authenticated).
    #[default]
    AesGcm,
    /// AES-256 in CBC mode with PKCS#7 padding.
    Aes,
    /// Three-key TripleDES in CBC mode.
    TripleDes,
    /// Single DES in CBC mode. Kept for reading legacy files.
    Des,
}

impl SymmetricAlgorithm {
    pub const ALL: [SymmetricAlgorithm; 4] = [
        SymmetricAlgorithm::AesGcm,
        SymmetricAlgorithm::Aes,
        SymmetricAlgorithm::TripleDes,
        SymmetricAlgorithm::Des,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SymmetricAlgorithm::AesGcm => "aes-gcm",
            SymmetricAlgorithm::Aes => "aes",
            SymmetricAlgorithm::TripleDes => "triple-des",
            SymmetricAlgorithm::Des => "des",
        }
    }

    /// Derived key length in bytes.
    pub fn key_len(self) -> usize {
        match self {
            SymmetricAlgorithm::AesGcm | SymmetricAlgorithm::Aes => 32,
            SymmetricAlgorithm::TripleDes => 24,
            SymmetricAlgorithm::Des => 8,
        }
    }

    /// Length of the nonce (GCM) or IV (CBC) stored in front of the ciphertext.
    pub fn iv_len(self) -> usize {
        match self {
            SymmetricAlgorithm::AesGcm => 12,
            SymmetricAlgorithm::Aes => 16,
            SymmetricAlgorithm::TripleDes | SymmetricAlgorithm::Des => 8,
        }
    }
}

impl fmt::Display for SymmetricAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SymmetricAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match normalized.as_str() {
            "aesgcm" => Ok(SymmetricAlgorithm::AesGcm),
            "aes" | "aescbc" => Ok(SymmetricAlgorithm::Aes),
            "tripledes" | "3des" | "tdes" => Ok(SymmetricAlgorithm::TripleDes),
            "des" => Ok(SymmetricAlgorithm::Des),
            _ => Err(format!("unknown symmetric algorithm '{}'", s.trim())),
        }
    }
}

// ============================================================================
// Compliance gate
// ============================================================================

/// Decides whether an algorithm is acceptable under a compliance policy.
pub trait ComplianceCheck: Send + Sync {
    fn is_compliant(&self, algorithm: SymmetricAlgorithm) -> bool;
}

/// The FIPS 140 approved subset of [`SymmetricAlgorithm`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FipsAllowList;

impl FipsAllowList {
    const APPROVED: &'static [SymmetricAlgorithm] = &[
        SymmetricAlgorithm::AesGcm,
        SymmetricAlgorithm::Aes,
        SymmetricAlgorithm::TripleDes,
    ];
}

impl ComplianceCheck for FipsAllowList {
    fn is_compliant(&self, algorithm: SymmetricAlgorithm) -> bool {
        Self::APPROVED.contains(&algorithm)
    }
}

/// Outcome of checking one configured algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComplianceFinding {
    pub algorithm: SymmetricAlgorithm,
    pub compliant: bool,
}

/// Pure configuration-time check; holds no state between calls.
pub fn check_compliance(
    algorithm: SymmetricAlgorithm,
    policy: &dyn ComplianceCheck,
) -> ComplianceFinding {
    ComplianceFinding {
        algorithm,
        compliant: policy.is_compliant(algorithm),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_aes_gcm() {
        assert_eq!(SymmetricAlgorithm::default(), SymmetricAlgorithm::AesGcm);
    }

    #[test]
    fn only_des_fails_fips() {
        for algorithm in SymmetricAlgorithm::ALL {
            let finding = check_compliance(algorithm, &FipsAllowList);
            assert_eq!(finding.compliant, algorithm != SymmetricAlgorithm::Des, "{algorithm}");
        }
    }

    #[test]
    fn parses_loose_names() {
        assert_eq!("AES-GCM".parse::<SymmetricAlgorithm>().unwrap(), SymmetricAlgorithm::AesGcm);
        assert_eq!("AESGCM".parse::<SymmetricAlgorithm>().unwrap(), SymmetricAlgorithm::AesGcm);
        assert_eq!("TripleDES".parse::<SymmetricAlgorithm>().unwrap(), SymmetricAlgorithm::TripleDes);
        assert_eq!("3des".parse::<SymmetricAlgorithm>().unwrap(), SymmetricAlgorithm::TripleDes);
        assert!("rc4".parse::<SymmetricAlgorithm>().is_err());
    }

    #[test]
    fn names_parse_back() {
        for algorithm in SymmetricAlgorithm::ALL {
            assert_eq!(algorithm.name().parse::<SymmetricAlgorithm>().unwrap(), algorithm);
        }
    }

    #[test]
    fn serde_uses_kebab_names() {
        let json = serde_json::to_string(&SymmetricAlgorithm::TripleDes).unwrap();
        assert_eq!(json, "\"triple-des\"");
        let back: SymmetricAlgorithm = serde_json::from_str("\"aes-gcm\"").unwrap();
        assert_eq!(back, SymmetricAlgorithm::AesGcm);
    }
}
