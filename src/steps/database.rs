//! Steps that hand the host a database connection.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use super::dispatch::dispatch_blocking;
use super::fault::{settle, FaultPolicy};
use super::{PendingOutputs, Step, StepContext};
use crate::config::DatabaseConfig;
use crate::database::{
    begin_if_requested, open_or_reuse, select_source, ConnectionFactory, ConnectionHandle,
    DatabaseConnection, DbConnectionFactory,
};
use crate::error::StepError;
use crate::secrets::SecretArgs;

/// Outputs shared by the database steps.
#[derive(Debug, Default, Clone)]
pub struct ConnectionOutputs {
    /// Absent when a failure was suppressed.
    pub database_connection: Option<ConnectionHandle>,
}

// ============================================================================
// DatabaseTransaction
// ============================================================================

/// Opens a connection (or reuses one) and optionally begins a transaction.
pub struct DatabaseTransaction {
    pub provider_name: String,
    pub connection_string: SecretArgs,
    /// Connection supplied by an earlier step; used instead of opening one.
    pub existing_connection: Option<DatabaseConnection>,
    pub use_transaction: bool,
    pub continue_on_error: bool,
    factory: Arc<dyn ConnectionFactory>,
}

impl DatabaseTransaction {
    pub fn new(factory: Arc<dyn ConnectionFactory>) -> Self {
        Self {
            provider_name: String::new(),
            connection_string: SecretArgs::none(),
            existing_connection: None,
            use_transaction: true,
            continue_on_error: false,
            factory,
        }
    }

    pub fn from_config(config: &DatabaseConfig) -> Self {
        Self::new(Arc::new(DbConnectionFactory::new(config)))
    }

    pub fn with_provider(mut self, provider_name: impl Into<String>) -> Self {
        self.provider_name = provider_name.into();
        self
    }

    pub fn with_connection_string(mut self, connection_string: SecretArgs) -> Self {
        self.connection_string = connection_string;
        self
    }

    pub fn with_existing(mut self, connection: DatabaseConnection) -> Self {
        self.existing_connection = Some(connection);
        self
    }

    pub fn with_transaction(mut self, use_transaction: bool) -> Self {
        self.use_transaction = use_transaction;
        self
    }

    pub fn with_continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }
}

impl fmt::Debug for DatabaseTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseTransaction")
            .field("provider_name", &self.provider_name)
            .field("existing_connection", &self.existing_connection)
            .field("use_transaction", &self.use_transaction)
            .field("continue_on_error", &self.continue_on_error)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Step for DatabaseTransaction {
    type Outputs = ConnectionOutputs;

    fn name(&self) -> &'static str {
        "database_transaction"
    }

    async fn execute(
        &self,
        ctx: &StepContext,
    ) -> Result<PendingOutputs<ConnectionOutputs>, StepError> {
        let result = acquire(
            ctx,
            Arc::clone(&self.factory),
            self.existing_connection.as_ref(),
            &self.connection_string,
            &self.provider_name,
            self.use_transaction,
        )
        .await;
        settle(
            self.name(),
            FaultPolicy::from_flag(self.continue_on_error),
            result,
            assign_connection,
        )
    }
}

// ============================================================================
// DatabaseConnect
// ============================================================================

/// Opens a new connection without starting a transaction.
pub struct DatabaseConnect {
    pub provider_name: String,
    pub connection_string: SecretArgs,
    pub continue_on_error: bool,
    factory: Arc<dyn ConnectionFactory>,
}

impl DatabaseConnect {
    pub fn new(factory: Arc<dyn ConnectionFactory>) -> Self {
        Self {
            provider_name: String::new(),
            connection_string: SecretArgs::none(),
            continue_on_error: false,
            factory,
        }
    }

    pub fn from_config(config: &DatabaseConfig) -> Self {
        Self::new(Arc::new(DbConnectionFactory::new(config)))
    }

    pub fn with_provider(mut self, provider_name: impl Into<String>) -> Self {
        self.provider_name = provider_name.into();
        self
    }

    pub fn with_connection_string(mut self, connection_string: SecretArgs) -> Self {
        self.connection_string = connection_string;
        self
    }

    pub fn with_continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }
}

impl fmt::Debug for DatabaseConnect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConnect")
            .field("provider_name", &self.provider_name)
            .field("continue_on_error", &self.continue_on_error)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Step for DatabaseConnect {
    type Outputs = ConnectionOutputs;

    fn name(&self) -> &'static str {
        "database_connect"
    }

    async fn execute(
        &self,
        ctx: &StepContext,
    ) -> Result<PendingOutputs<ConnectionOutputs>, StepError> {
        let result = acquire(
            ctx,
            Arc::clone(&self.factory),
            None,
            &self.connection_string,
            &self.provider_name,
            false,
        )
        .await;
        settle(
            self.name(),
            FaultPolicy::from_flag(self.continue_on_error),
            result,
            assign_connection,
        )
    }
}

// ============================================================================
// Shared acquisition
// ============================================================================

fn assign_connection(outputs: &mut ConnectionOutputs, handle: ConnectionHandle) {
    outputs.database_connection = Some(handle);
}

/// Resolve the connection source on the caller's context, then open or reuse
/// and begin the transaction in a single background dispatch.
async fn acquire(
    ctx: &StepContext,
    factory: Arc<dyn ConnectionFactory>,
    existing: Option<&DatabaseConnection>,
    connection_string: &SecretArgs,
    provider: &str,
    use_transaction: bool,
) -> Result<ConnectionHandle, StepError> {
    let request = select_source(existing, connection_string.input("connection string")?, provider)?;

    let handle = dispatch_blocking(ctx, move || {
        let handle = open_or_reuse(factory.as_ref(), request)?;
        if let Err(err) = begin_if_requested(&handle, use_transaction) {
            if handle.is_owned() {
                if let Err(close_err) = handle.close() {
                    warn!(error = %close_err, "failed to close connection after begin failed");
                }
            }
            return Err(err);
        }
        Ok(handle)
    })
    .await?;

    info!(
        connection = %handle.connection().id(),
        provider = %handle.connection().provider(),
        owned = handle.is_owned(),
        in_transaction = handle.in_transaction(),
        "connection ready"
    );
    Ok(handle)
}
