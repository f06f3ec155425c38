//! Provider routing.
//!
//! The factory only maps a provider name to a driver; it does not validate
//! provider names up front. An unknown or empty name is rejected when a
//! connection is requested.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::connection::{DatabaseConnection, DbSession};
use super::sqlite::SqliteSession;
use super::DbError;
use crate::config::DatabaseConfig;

/// Provider names routed to the built-in SQLite driver.
pub const SQLITE_PROVIDERS: &[&str] = &["sqlite", "system.data.sqlite", "microsoft.data.sqlite"];

/// Creates connections for a provider. Calls block.
pub trait ConnectionFactory: Send + Sync {
    fn create(
        &self,
        connection_string: &str,
        provider_name: &str,
    ) -> Result<DatabaseConnection, DbError>;
}

type DriverOpener = Arc<dyn Fn(&str) -> Result<Box<dyn DbSession>, DbError> + Send + Sync>;

/// Registry of drivers keyed by lower-cased provider name.
#[derive(Clone, Default)]
pub struct DbConnectionFactory {
    drivers: HashMap<String, DriverOpener>,
}

impl DbConnectionFactory {
    /// A factory with no drivers.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A factory with the built-in SQLite driver registered under
    /// [`SQLITE_PROVIDERS`].
    pub fn new(config: &DatabaseConfig) -> Self {
        let busy_timeout = Duration::from_millis(config.busy_timeout_ms);
        let mut factory = Self::empty();
        for name in SQLITE_PROVIDERS {
            factory.register(name, move |cs| {
                Ok(Box::new(SqliteSession::open(cs, busy_timeout)?) as Box<dyn DbSession>)
            });
        }
        factory
    }

    /// Register (or replace) the driver for `provider`.
    pub fn register<F>(&mut self, provider: &str, opener: F)
    where
        F: Fn(&str) -> Result<Box<dyn DbSession>, DbError> + Send + Sync + 'static,
    {
        self.drivers.insert(normalize(provider), Arc::new(opener));
    }

    pub fn providers(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.drivers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl ConnectionFactory for DbConnectionFactory {
    fn create(
        &self,
        connection_string: &str,
        provider_name: &str,
    ) -> Result<DatabaseConnection, DbError> {
        let key = normalize(provider_name);
        let opener = self
            .drivers
            .get(&key)
            .ok_or_else(|| DbError::UnknownProvider(provider_name.trim().to_string()))?;

        debug!(provider = %key, "opening database connection");
        let session = opener(connection_string)?;
        Ok(DatabaseConnection::new(key, session))
    }
}

fn normalize(provider: &str) -> String {
    provider.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::connection::tests::FakeSession;

    #[test]
    fn builtin_sqlite_aliases_are_registered() {
        let factory = DbConnectionFactory::new(&DatabaseConfig::default());
        assert_eq!(
            factory.providers(),
            vec!["microsoft.data.sqlite", "sqlite", "system.data.sqlite"]
        );
        let conn = factory.create("Data Source=:memory:", " SQLite ").unwrap();
        assert_eq!(conn.provider(), "sqlite");
        assert!(conn.is_open());
    }

    #[test]
    fn unknown_and_empty_providers_are_rejected_here() {
        let factory = DbConnectionFactory::new(&DatabaseConfig::default());
        assert!(matches!(
            factory.create("Server=x", "oracle"),
            Err(DbError::UnknownProvider(name)) if name == "oracle"
        ));
        assert!(matches!(
            factory.create("Server=x", ""),
            Err(DbError::UnknownProvider(_))
        ));
    }

    #[test]
    fn custom_driver_can_be_registered() {
        let mut factory = DbConnectionFactory::empty();
        factory.register("SqlClient", |_| Ok(Box::<FakeSession>::default() as Box<dyn DbSession>));
        let conn = factory.create("Server=x;Database=y;", "sqlclient").unwrap();
        assert_eq!(conn.provider(), "sqlclient");
    }

    #[test]
    fn driver_errors_pass_through() {
        let factory = DbConnectionFactory::new(&DatabaseConfig::default());
        assert!(matches!(
            factory.create("Mode=ReadWrite", "sqlite"),
            Err(DbError::InvalidConnectionString(_))
        ));
    }
}
