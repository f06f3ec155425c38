//! Password-based symmetric encryption.
//!
//! Container layout: `salt (16) || rounds (u32 BE) || iv or nonce || ciphertext`.
//! The key bytes handed in by the caller are stretched with PBKDF2-HMAC-SHA256
//! over the salt into a key of the algorithm's native length. Decryption uses
//! the round count stored in the container, not the one configured locally.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroizing;

use super::algorithm::SymmetricAlgorithm;
use crate::secrets::ResolvedSecret;

/// Random salt length prepended to every container.
pub const SALT_LEN: usize = 16;

/// Width of the big-endian round count stored after the salt.
pub const ROUNDS_LEN: usize = 4;

/// PBKDF2 rounds used when none are configured.
pub const DEFAULT_KDF_ITERATIONS: u32 = 10_000;

/// Largest round count a container may ask for.
pub const MAX_KDF_ITERATIONS: u32 = 10_000_000;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;
type TdesCbcEnc = cbc::Encryptor<des::TdesEde3>;
type TdesCbcDec = cbc::Decryptor<des::TdesEde3>;
type DesCbcEnc = cbc::Encryptor<des::Des>;
type DesCbcDec = cbc::Decryptor<des::Des>;

#[derive(Debug, thiserror::Error)]
pub enum CipherError {
    #[error("key material is empty")]
    EmptyKey,

    #[error("{0} rejected the derived key or iv length")]
    InvalidLength(SymmetricAlgorithm),

    #[error("{0} encryption failed")]
    Encrypt(SymmetricAlgorithm),

    #[error("{0} decryption failed: wrong key, algorithm or corrupted data")]
    Decrypt(SymmetricAlgorithm),

    #[error("ciphertext is too short to be a {0} container")]
    Truncated(SymmetricAlgorithm),

    #[error("container asks for {0} key derivation rounds, outside 1..={max}", max = MAX_KDF_ITERATIONS)]
    RoundsOutOfRange(u32),
}

/// One transform: built right before the call and dropped right after.
#[derive(Debug, Clone, Copy)]
pub struct CipherRequest<'a> {
    pub algorithm: SymmetricAlgorithm,
    pub payload: &'a [u8],
    pub key: &'a ResolvedSecret,
}

/// Encrypts and decrypts containers. Calls block; steps dispatch them onto a
/// background worker.
pub trait CipherService: Send + Sync {
    fn encrypt(&self, request: CipherRequest<'_>) -> Result<Vec<u8>, CipherError>;
    fn decrypt(&self, request: CipherRequest<'_>) -> Result<Vec<u8>, CipherError>;
}

/// [`CipherService`] backed by the RustCrypto block and AEAD crates.
#[derive(Debug, Clone, Copy)]
pub struct RustCryptoCipher {
    iterations: u32,
}

impl RustCryptoCipher {
    /// Rounds used when encrypting, clamped to `1..=MAX_KDF_ITERATIONS`.
    pub fn new(iterations: u32) -> Self {
        Self {
            iterations: iterations.clamp(1, MAX_KDF_ITERATIONS),
        }
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

}

fn derive_key(
    algorithm: SymmetricAlgorithm,
    key: &ResolvedSecret,
    salt: &[u8],
    rounds: u32,
) -> Result<Zeroizing<Vec<u8>>, CipherError> {
    if key.is_empty() {
        return Err(CipherError::EmptyKey);
    }
    let mut derived = Zeroizing::new(vec![0u8; algorithm.key_len()]);
    pbkdf2::pbkdf2_hmac::<Sha256>(key.as_bytes(), salt, rounds, &mut derived);
    Ok(derived)
}

impl Default for RustCryptoCipher {
    fn default() -> Self {
        Self::new(DEFAULT_KDF_ITERATIONS)
    }
}

impl CipherService for RustCryptoCipher {
    fn encrypt(&self, request: CipherRequest<'_>) -> Result<Vec<u8>, CipherError> {
        let algorithm = request.algorithm;

        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        let mut iv = vec![0u8; algorithm.iv_len()];
        OsRng.fill_bytes(&mut iv);

        let key = derive_key(algorithm, request.key, &salt, self.iterations)?;
        let invalid = |_| CipherError::InvalidLength(algorithm);

        let body = match algorithm {
            SymmetricAlgorithm::AesGcm => {
                let cipher = Aes256Gcm::new_from_slice(&key).map_err(invalid)?;
                cipher
                    .encrypt(Nonce::from_slice(&iv), request.payload)
                    .map_err(|_| CipherError::Encrypt(algorithm))?
            }
            SymmetricAlgorithm::Aes => Aes256CbcEnc::new_from_slices(&key, &iv)
                .map_err(invalid)?
                .encrypt_padded_vec_mut::<Pkcs7>(request.payload),
            SymmetricAlgorithm::TripleDes => TdesCbcEnc::new_from_slices(&key, &iv)
                .map_err(invalid)?
                .encrypt_padded_vec_mut::<Pkcs7>(request.payload),
            SymmetricAlgorithm::Des => DesCbcEnc::new_from_slices(&key, &iv)
                .map_err(invalid)?
                .encrypt_padded_vec_mut::<Pkcs7>(request.payload),
        };

        let mut container = Vec::with_capacity(SALT_LEN + ROUNDS_LEN + iv.len() + body.len());
        container.extend_from_slice(&salt);
        container.extend_from_slice(&self.iterations.to_be_bytes());
        container.extend_from_slice(&iv);
        container.extend_from_slice(&body);
        Ok(container)
    }

    fn decrypt(&self, request: CipherRequest<'_>) -> Result<Vec<u8>, CipherError> {
        let algorithm = request.algorithm;
        let header = SALT_LEN + ROUNDS_LEN + algorithm.iv_len();
        if request.payload.len() < header {
            return Err(CipherError::Truncated(algorithm));
        }

        let (salt, rest) = request.payload.split_at(SALT_LEN);
        let (rounds, rest) = rest.split_at(ROUNDS_LEN);
        let (iv, body) = rest.split_at(algorithm.iv_len());

        let mut rounds_be = [0u8; ROUNDS_LEN];
        rounds_be.copy_from_slice(rounds);
        let rounds = u32::from_be_bytes(rounds_be);
        if rounds == 0 || rounds > MAX_KDF_ITERATIONS {
            return Err(CipherError::RoundsOutOfRange(rounds));
        }

        let key = derive_key(algorithm, request.key, salt, rounds)?;
        let invalid = |_| CipherError::InvalidLength(algorithm);

        match algorithm {
            SymmetricAlgorithm::AesGcm => {
                let cipher = Aes256Gcm::new_from_slice(&key).map_err(invalid)?;
                cipher
                    .decrypt(Nonce::from_slice(iv), body)
                    .map_err(|_| CipherError::Decrypt(algorithm))
            }
            SymmetricAlgorithm::Aes => Aes256CbcDec::new_from_slices(&key, iv)
                .map_err(invalid)?
                .decrypt_padded_vec_mut::<Pkcs7>(body)
                .map_err(|_| CipherError::Decrypt(algorithm)),
            SymmetricAlgorithm::TripleDes => TdesCbcDec::new_from_slices(&key, iv)
                .map_err(invalid)?
                .decrypt_padded_vec_mut::<Pkcs7>(body)
                .map_err(|_| CipherError::Decrypt(algorithm)),
            SymmetricAlgorithm::Des => DesCbcDec::new_from_slices(&key, iv)
                .map_err(invalid)?
                .decrypt_padded_vec_mut::<Pkcs7>(body)
                .map_err(|_| CipherError::Decrypt(algorithm)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(text: &str) -> ResolvedSecret {
        ResolvedSecret::new(text.as_bytes().to_vec())
    }

    fn fast() -> RustCryptoCipher {
        RustCryptoCipher::new(10)
    }

    #[test]
    fn every_algorithm_round_trips() {
        let k = key("k1");
        let payload = b"the quick brown fox jumps over the lazy dog";
        for algorithm in SymmetricAlgorithm::ALL {
            let sealed = fast()
                .encrypt(CipherRequest { algorithm, payload, key: &k })
                .unwrap();
            assert_ne!(&sealed[SALT_LEN + ROUNDS_LEN + algorithm.iv_len()..], &payload[..]);
            let opened = fast()
                .decrypt(CipherRequest { algorithm, payload: &sealed, key: &k })
                .unwrap();
            assert_eq!(opened, payload, "{algorithm}");
        }
    }

    #[test]
    fn empty_payload_round_trips() {
        let k = key("k1");
        let algorithm = SymmetricAlgorithm::AesGcm;
        let sealed = fast()
            .encrypt(CipherRequest { algorithm, payload: &[], key: &k })
            .unwrap();
        let opened = fast()
            .decrypt(CipherRequest { algorithm, payload: &sealed, key: &k })
            .unwrap();
        assert!(opened.is_empty());
    }

    #[test]
    fn salts_make_ciphertexts_differ() {
        let k = key("k1");
        let request = CipherRequest {
            algorithm: SymmetricAlgorithm::AesGcm,
            payload: &[1, 2, 3],
            key: &k,
        };
        assert_ne!(fast().encrypt(request).unwrap(), fast().encrypt(request).unwrap());
    }

    #[test]
    fn wrong_key_fails_authentication() {
        let algorithm = SymmetricAlgorithm::AesGcm;
        let sealed = fast()
            .encrypt(CipherRequest { algorithm, payload: &[1, 2, 3], key: &key("k1") })
            .unwrap();
        let err = fast()
            .decrypt(CipherRequest { algorithm, payload: &sealed, key: &key("k2") })
            .unwrap_err();
        assert!(matches!(err, CipherError::Decrypt(SymmetricAlgorithm::AesGcm)));
    }

    #[test]
    fn short_container_is_truncated() {
        let err = fast()
            .decrypt(CipherRequest {
                algorithm: SymmetricAlgorithm::Aes,
                payload: &[0u8; 10],
                key: &key("k1"),
            })
            .unwrap_err();
        assert!(matches!(err, CipherError::Truncated(SymmetricAlgorithm::Aes)));
    }

    #[test]
    fn empty_key_is_rejected() {
        let err = fast()
            .encrypt(CipherRequest {
                algorithm: SymmetricAlgorithm::AesGcm,
                payload: &[1],
                key: &key(""),
            })
            .unwrap_err();
        assert!(matches!(err, CipherError::EmptyKey));
    }

    #[test]
    fn iterations_are_clamped() {
        assert_eq!(RustCryptoCipher::new(0).iterations(), 1);
        assert_eq!(RustCryptoCipher::new(u32::MAX).iterations(), MAX_KDF_ITERATIONS);
    }

    #[test]
    fn decrypt_uses_rounds_from_container() {
        let k = key("k1");
        for algorithm in SymmetricAlgorithm::ALL {
            let sealed = RustCryptoCipher::new(37)
                .encrypt(CipherRequest { algorithm, payload: &[1, 2, 3], key: &k })
                .unwrap();
            assert_eq!(&sealed[SALT_LEN..SALT_LEN + ROUNDS_LEN], &37u32.to_be_bytes());

            let opened = RustCryptoCipher::new(5_000)
                .decrypt(CipherRequest { algorithm, payload: &sealed, key: &k })
                .unwrap();
            assert_eq!(opened, vec![1, 2, 3], "{algorithm}");
        }
    }

    #[test]
    fn out_of_range_rounds_are_rejected() {
        let k = key("k1");
        let algorithm = SymmetricAlgorithm::AesGcm;
        let mut sealed = fast()
            .encrypt(CipherRequest { algorithm, payload: &[1], key: &k })
            .unwrap();

        sealed[SALT_LEN..SALT_LEN + ROUNDS_LEN].copy_from_slice(&0u32.to_be_bytes());
        let err = fast()
            .decrypt(CipherRequest { algorithm, payload: &sealed, key: &k })
            .unwrap_err();
        assert!(matches!(err, CipherError::RoundsOutOfRange(0)));

        sealed[SALT_LEN..SALT_LEN + ROUNDS_LEN].copy_from_slice(&u32::MAX.to_be_bytes());
        let err = fast()
            .decrypt(CipherRequest { algorithm, payload: &sealed, key: &k })
            .unwrap_err();
        assert!(matches!(err, CipherError::RoundsOutOfRange(u32::MAX)));
    }
}
