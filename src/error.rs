//! Error types shared by every step.
//!
//! Driver and cipher failures keep their own enums (`DbError`, `CipherError`)
//! and are wrapped as sources so the fault policy can log the full chain.

use std::path::PathBuf;

use crate::crypto::CipherError;
use crate::database::DbError;

/// Failure raised while a step resolves credentials or acquires a resource.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    /// Neither the plain nor the protected form of a credential was supplied.
    #[error("either a plain or a protected {field} must be provided")]
    MissingCredential { field: &'static str },

    /// Both forms of a credential (or a credential and an existing connection)
    /// were supplied.
    #[error("only one of plain {field} or protected {field} may be provided")]
    AmbiguousCredential { field: &'static str },

    /// The key text cannot be turned into bytes without an encoding.
    #[error("a text encoding is required to decode the key")]
    MissingEncoding,

    /// A required string input was absent or blank.
    #[error("required input '{0}' is missing")]
    MissingInput(&'static str),

    #[error("input file '{}' does not exist", .0.display())]
    InputNotFound(PathBuf),

    #[error("output file '{}' already exists and overwrite is disabled", .0.display())]
    OutputExists(PathBuf),

    /// The connection factory could not produce a connection.
    #[error("provider '{provider}' failed to open a connection: {source}")]
    ProviderFailure {
        provider: String,
        #[source]
        source: DbError,
    },

    #[error("cipher operation failed: {0}")]
    CipherFailure(#[from] CipherError),

    #[error("failed to begin transaction: {0}")]
    TransactionFailure(#[source] DbError),

    #[error("i/o error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Cancellation was requested before the background work was dispatched.
    #[error("step was cancelled before dispatch")]
    Cancelled,

    /// The background worker panicked or was torn down.
    #[error("background worker failed: {0}")]
    Background(String),
}

impl StepError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Render an error together with every `source()` beneath it, joined by `: `.
///
/// A source whose message already ends the rendered text is not repeated.
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut rendered = err.to_string();
    let mut current = err.source();
    while let Some(source) = current {
        let message = source.to_string();
        if !rendered.ends_with(&message) {
            rendered.push_str(": ");
            rendered.push_str(&message);
        }
        current = source.source();
    }
    rendered
}
