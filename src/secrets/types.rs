//! Secret value types.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use zeroize::Zeroizing;

use crate::error::StepError;

// ============================================================================
// Protected buffer
// ============================================================================

/// A secret the host hands over in protected form.
///
/// The text is only reachable through [`super::reveal`], which returns a
/// zeroizing copy scoped to the caller.
pub struct ProtectedSecret(SecretString);

impl ProtectedSecret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretString::from(value.into()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.expose_secret().is_empty()
    }

    pub(super) fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl From<String> for ProtectedSecret {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl fmt::Debug for ProtectedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ProtectedSecret([REDACTED])")
    }
}

// ============================================================================
// Resolved secret
// ============================================================================

/// Decoded secret bytes, wiped when dropped.
#[derive(PartialEq, Eq)]
pub struct ResolvedSecret(Zeroizing<Vec<u8>>);

impl ResolvedSecret {
    pub(crate) fn new(bytes: Vec<u8>) -> Self {
        Self(Zeroizing::new(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for ResolvedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResolvedSecret({} bytes)", self.0.len())
    }
}

// ============================================================================
// Host inputs
// ============================================================================

/// The two mutually exclusive ways a host can supply one secret.
#[derive(Default)]
pub struct SecretArgs {
    pub plain: Option<String>,
    pub protected: Option<ProtectedSecret>,
}

impl SecretArgs {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn plain(value: impl Into<String>) -> Self {
        Self {
            plain: Some(value.into()),
            protected: None,
        }
    }

    pub fn protected(value: ProtectedSecret) -> Self {
        Self {
            plain: None,
            protected: Some(value),
        }
    }

    /// Collapse the pair into a single variant.
    ///
    /// Blank plain text and empty protected buffers count as absent. Both
    /// present is [`StepError::AmbiguousCredential`]; neither present is
    /// [`SecretInput::None`], which the caller may or may not accept.
    pub fn input(&self, field: &'static str) -> Result<SecretInput<'_>, StepError> {
        let plain = self.plain.as_deref().filter(|s| !s.trim().is_empty());
        let protected = self.protected.as_ref().filter(|p| !p.is_empty());

        match (plain, protected) {
            (Some(_), Some(_)) => Err(StepError::AmbiguousCredential { field }),
            (Some(text), None) => Ok(SecretInput::Plain(text)),
            (None, Some(buffer)) => Ok(SecretInput::Protected(buffer)),
            (None, None) => Ok(SecretInput::None),
        }
    }
}

/// Exactly one source for a secret, or none at all.
#[derive(Clone, Copy)]
pub enum SecretInput<'a> {
    Plain(&'a str),
    Protected(&'a ProtectedSecret),
    None,
}

impl SecretInput<'_> {
    pub fn is_none(&self) -> bool {
        matches!(self, SecretInput::None)
    }
}

impl fmt::Debug for SecretArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretArgs")
            .field("plain", &self.plain.as_ref().map(|_| "[REDACTED]"))
            .field("protected", &self.protected)
            .finish()
    }
}

impl fmt::Debug for SecretInput<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretInput::Plain(_) => f.write_str("Plain([REDACTED])"),
            SecretInput::Protected(_) => f.write_str("Protected([REDACTED])"),
            SecretInput::None => f.write_str("None"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_present_is_ambiguous() {
        let args = SecretArgs {
            plain: Some("k1".into()),
            protected: Some(ProtectedSecret::new("k2")),
        };
        let err = args.input("key").unwrap_err();
        assert!(matches!(err, StepError::AmbiguousCredential { field: "key" }));
    }

    #[test]
    fn blank_plain_counts_as_absent() {
        let args = SecretArgs {
            plain: Some("   ".into()),
            protected: Some(ProtectedSecret::new("k2")),
        };
        assert!(matches!(args.input("key").unwrap(), SecretInput::Protected(_)));
        assert!(SecretArgs::plain("").input("key").unwrap().is_none());
    }

    #[test]
    fn empty_protected_counts_as_absent() {
        let args = SecretArgs::protected(ProtectedSecret::new(""));
        assert!(args.input("key").unwrap().is_none());
    }

    #[test]
    fn debug_never_shows_secret_text() {
        let protected = ProtectedSecret::new("hunter2");
        assert!(!format!("{protected:?}").contains("hunter2"));

        let resolved = ResolvedSecret::new(b"hunter2".to_vec());
        assert_eq!(format!("{resolved:?}"), "ResolvedSecret(7 bytes)");

        let args = SecretArgs::plain("hunter2");
        assert!(!format!("{args:?}").contains("hunter2"));
        assert!(!format!("{:?}", args.input("key").unwrap()).contains("hunter2"));
    }
}
