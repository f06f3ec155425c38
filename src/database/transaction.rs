//! Transaction scope: begin only. Commit and rollback belong to later steps.

use tracing::debug;

use super::connection::ConnectionHandle;
use crate::error::StepError;

/// Begin a transaction on `handle` when `use_transaction` is set.
///
/// Ownership does not matter here: a borrowed connection may have a
/// transaction started on it, it just may not be closed.
pub fn begin_if_requested(
    handle: &ConnectionHandle,
    use_transaction: bool,
) -> Result<(), StepError> {
    if !use_transaction {
        return Ok(());
    }
    handle
        .connection()
        .begin_transaction()
        .map_err(StepError::TransactionFailure)?;
    debug!(
        connection = %handle.connection().id(),
        owned = handle.is_owned(),
        "transaction started"
    );
    Ok(())
}
