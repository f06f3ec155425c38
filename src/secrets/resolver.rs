//! Turns a [`SecretInput`] into the concrete secret an operation consumes.

use zeroize::Zeroizing;

use super::encoding::TextEncoding;
use super::types::{ProtectedSecret, ResolvedSecret, SecretInput};
use crate::error::StepError;

/// The only place protected text leaves its buffer.
///
/// Both the key path and the connection-string path go through here so there
/// is a single decode routine to audit.
pub fn reveal(protected: &ProtectedSecret) -> Zeroizing<String> {
    Zeroizing::new(protected.expose().to_owned())
}

/// Resolve key material into bytes using `encoding`.
pub fn resolve_key(
    input: SecretInput<'_>,
    encoding: Option<TextEncoding>,
    field: &'static str,
) -> Result<ResolvedSecret, StepError> {
    let revealed: Zeroizing<String>;
    let text = match input {
        SecretInput::Plain(text) => text,
        SecretInput::Protected(buffer) => {
            revealed = reveal(buffer);
            revealed.as_str()
        }
        SecretInput::None => return Err(StepError::MissingCredential { field }),
    };
    let encoding = encoding.ok_or(StepError::MissingEncoding)?;

    let mut bytes = encoding.encode(text);
    Ok(ResolvedSecret::new(std::mem::take(&mut *bytes)))
}

/// Resolve a textual secret such as a connection string.
pub fn resolve_text(
    input: SecretInput<'_>,
    field: &'static str,
) -> Result<Zeroizing<String>, StepError> {
    match input {
        SecretInput::Plain(text) => Ok(Zeroizing::new(text.to_owned())),
        SecretInput::Protected(buffer) => Ok(reveal(buffer)),
        SecretInput::None => Err(StepError::MissingCredential { field }),
    }
}

/// Require a non-blank string input such as a file path.
///
/// Whitespace only decides blankness; the value is returned untouched.
pub fn require_input<'a>(
    value: Option<&'a str>,
    name: &'static str,
) -> Result<&'a str, StepError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(StepError::MissingInput(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::SecretArgs;

    #[test]
    fn missing_key_is_reported_before_encoding() {
        let err = resolve_key(SecretInput::None, None, "key").unwrap_err();
        assert!(matches!(err, StepError::MissingCredential { field: "key" }));
    }

    #[test]
    fn key_requires_encoding() {
        let err = resolve_key(SecretInput::Plain("k1"), None, "key").unwrap_err();
        assert!(matches!(err, StepError::MissingEncoding));
    }

    #[test]
    fn plain_and_protected_resolve_identically() {
        let plain = resolve_key(SecretInput::Plain("k1"), Some(TextEncoding::Utf8), "key").unwrap();
        let buffer = ProtectedSecret::new("k1");
        let protected =
            resolve_key(SecretInput::Protected(&buffer), Some(TextEncoding::Utf8), "key").unwrap();
        assert_eq!(plain, protected);
        assert_eq!(plain.as_bytes(), b"k1");
    }

    #[test]
    fn resolution_is_repeatable() {
        let args = SecretArgs::protected(ProtectedSecret::new("p@ss"));
        let first = resolve_key(args.input("key").unwrap(), Some(TextEncoding::Utf16Le), "key").unwrap();
        let second = resolve_key(args.input("key").unwrap(), Some(TextEncoding::Utf16Le), "key").unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 8);
    }

    #[test]
    fn text_resolution_reveals_protected_value() {
        let buffer = ProtectedSecret::new("Data Source=:memory:");
        let text = resolve_text(SecretInput::Protected(&buffer), "connection string").unwrap();
        assert_eq!(text.as_str(), "Data Source=:memory:");
    }

    #[test]
    fn text_resolution_requires_a_source() {
        let err = resolve_text(SecretInput::None, "connection string").unwrap_err();
        assert!(matches!(
            err,
            StepError::MissingCredential { field: "connection string" }
        ));
    }

    #[test]
    fn blank_inputs_are_missing() {
        assert!(matches!(
            require_input(Some("  "), "input file path"),
            Err(StepError::MissingInput("input file path"))
        ));
        assert!(require_input(None, "output file path").is_err());
        assert_eq!(require_input(Some(" a.txt "), "input file path").unwrap(), " a.txt ");
    }
}
