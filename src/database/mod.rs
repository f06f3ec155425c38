//! Database connections acquired by the connect and transaction steps.
//!
//! Connections are opened through a [`ConnectionFactory`] that routes a
//! provider name to a registered driver; the built-in factory ships a SQLite
//! driver. A step hands its connection to the host as a [`ConnectionHandle`]
//! that records whether the step created it or merely borrowed it.

pub mod acquire;
pub mod connection;
pub mod connection_string;
pub mod factory;
pub mod sqlite;
pub mod transaction;

pub use acquire::{open_connection, open_or_reuse, select_source, AcquireRequest};
pub use connection::{ConnectionHandle, DatabaseConnection, DbSession};
pub use factory::{ConnectionFactory, DbConnectionFactory, SQLITE_PROVIDERS};
pub use transaction::begin_if_requested;

/// Driver-level failure.
///
/// Messages never echo connection strings; they may carry credentials.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("no driver registered for provider '{0}'")]
    UnknownProvider(String),

    #[error("invalid connection string: {0}")]
    InvalidConnectionString(String),

    #[error("connection is closed")]
    Closed,

    #[error("connection is borrowed and can only be closed by its owner")]
    NotOwner,

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error("{0}")]
    Driver(String),
}
