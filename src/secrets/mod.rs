//! Exclusive-credential resolution.
//!
//! Every step that needs a secret receives it from the host as two optional
//! inputs: a plain value and a protected buffer. [`SecretArgs::input`] turns
//! that pair into a [`SecretInput`] variant (rejecting the both-present case),
//! and the [`resolver`] functions turn the variant into a concrete secret that
//! lives only as long as the single operation consuming it.

pub mod encoding;
pub mod resolver;
pub mod types;

pub use encoding::TextEncoding;
pub use resolver::{require_input, resolve_key, resolve_text, reveal};
pub use types::{ProtectedSecret, ResolvedSecret, SecretArgs, SecretInput};
