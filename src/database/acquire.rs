//! Opening a new connection or reusing one supplied by the host.

use std::fmt;

use tracing::debug;
use zeroize::Zeroizing;

use super::connection::{ConnectionHandle, DatabaseConnection};
use super::factory::ConnectionFactory;
use crate::error::StepError;
use crate::secrets::{resolve_text, SecretInput};

/// What the background worker should do to obtain a connection.
pub enum AcquireRequest {
    /// Hand back the existing connection untouched.
    Reuse(DatabaseConnection),
    /// Open a new connection through the factory.
    Open {
        connection_string: Zeroizing<String>,
        provider: String,
    },
}

impl fmt::Debug for AcquireRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcquireRequest::Reuse(conn) => f.debug_tuple("Reuse").field(&conn.id()).finish(),
            AcquireRequest::Open { provider, .. } => f
                .debug_struct("Open")
                .field("provider", provider)
                .finish_non_exhaustive(),
        }
    }
}

/// Decide between reuse and open.
///
/// An existing connection alone is valid and skips secret resolution. An
/// existing connection together with any connection string is ambiguous.
/// Without an existing connection exactly one secret source must be present.
pub fn select_source(
    existing: Option<&DatabaseConnection>,
    secret: SecretInput<'_>,
    provider: &str,
) -> Result<AcquireRequest, StepError> {
    match (existing, secret) {
        (Some(conn), SecretInput::None) => Ok(AcquireRequest::Reuse(conn.clone())),
        (Some(_), _) => Err(StepError::AmbiguousCredential {
            field: "connection",
        }),
        (None, secret) => Ok(AcquireRequest::Open {
            connection_string: resolve_text(secret, "connection string")?,
            provider: provider.to_string(),
        }),
    }
}

/// Open a fresh connection, mapping factory errors to `ProviderFailure`.
pub fn open_connection(
    factory: &dyn ConnectionFactory,
    connection_string: &str,
    provider: &str,
) -> Result<DatabaseConnection, StepError> {
    factory
        .create(connection_string, provider)
        .map_err(|source| StepError::ProviderFailure {
            provider: provider.to_string(),
            source,
        })
}

/// Carry out `request`: reuse yields a borrowed handle, open an owned one.
pub fn open_or_reuse(
    factory: &dyn ConnectionFactory,
    request: AcquireRequest,
) -> Result<ConnectionHandle, StepError> {
    match request {
        AcquireRequest::Reuse(conn) => {
            debug!(connection = %conn.id(), "reusing existing connection");
            Ok(ConnectionHandle::Borrowed(conn))
        }
        AcquireRequest::Open {
            connection_string,
            provider,
        } => {
            let conn = open_connection(factory, &connection_string, &provider)?;
            debug!(connection = %conn.id(), provider = %conn.provider(), "opened new connection");
            Ok(ConnectionHandle::Owned(conn))
        }
    }
}
