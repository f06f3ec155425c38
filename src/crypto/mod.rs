//! Symmetric encryption of key-protected payloads.
//!
//! - [`algorithm`] names the supported ciphers and carries the FIPS allow-list
//!   consulted at configuration time.
//! - [`cipher`] holds the [`CipherService`] seam and the RustCrypto-backed
//!   implementation the file steps use by default.

pub mod algorithm;
pub mod cipher;

pub use algorithm::{
    check_compliance, ComplianceCheck, ComplianceFinding, FipsAllowList, SymmetricAlgorithm,
};
pub use cipher::{CipherError, CipherRequest, CipherService, RustCryptoCipher};
