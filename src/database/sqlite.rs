//! SQLite driver for the built-in connection factory.
//!
//! Recognised keys: `Data Source` (or `Filename`; `:memory:` for an in-memory
//! database), `Mode` (`ReadWriteCreate`, `ReadWrite`, `ReadOnly`, `Memory`) and
//! `Busy Timeout` / `Default Timeout` in seconds.

use std::time::Duration;

use rusqlite::{Connection, OpenFlags};
use tracing::debug;

use super::connection::DbSession;
use super::connection_string::ConnectionString;
use super::DbError;
use crate::logging;

const SOURCE_KEYS: &[&str] = &["data source", "datasource", "filename"];
const MODE_KEYS: &[&str] = &["mode"];
const TIMEOUT_KEYS: &[&str] = &["busy timeout", "default timeout", "timeout"];

pub struct SqliteSession {
    conn: Connection,
}

impl SqliteSession {
    /// Open a session described by `connection_string`. `busy_timeout` applies
    /// unless the string sets its own.
    pub fn open(connection_string: &str, busy_timeout: Duration) -> Result<Self, DbError> {
        let cs = ConnectionString::parse(connection_string)?;
        let source = cs.get(SOURCE_KEYS).ok_or_else(|| {
            DbError::InvalidConnectionString("missing 'Data Source'".to_string())
        })?;
        let mode = cs.get(MODE_KEYS).unwrap_or("readwritecreate").to_ascii_lowercase();

        let conn = if source == ":memory:" || mode == "memory" {
            Connection::open_in_memory()?
        } else {
            let access = match mode.as_str() {
                "readonly" => OpenFlags::SQLITE_OPEN_READ_ONLY,
                "readwrite" => OpenFlags::SQLITE_OPEN_READ_WRITE,
                "readwritecreate" => {
                    OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE
                }
                other => {
                    return Err(DbError::InvalidConnectionString(format!(
                        "unsupported mode '{other}'"
                    )))
                }
            };
            let flags = access | OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX;
            Connection::open_with_flags(source, flags)?
        };

        let timeout = match cs.get(TIMEOUT_KEYS) {
            Some(secs) => secs.parse::<u64>().map(Duration::from_secs).map_err(|_| {
                DbError::InvalidConnectionString("busy timeout must be whole seconds".to_string())
            })?,
            None => busy_timeout,
        };
        conn.busy_timeout(timeout)?;

        debug!(mode = %mode, timeout_ms = logging::millis(timeout), "sqlite session opened");
        Ok(Self { conn })
    }
}

impl DbSession for SqliteSession {
    fn begin_transaction(&mut self) -> Result<(), DbError> {
        self.conn.execute_batch("BEGIN")?;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), DbError> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), DbError> {
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }

    fn execute(&mut self, sql: &str) -> Result<usize, DbError> {
        Ok(self.conn.execute(sql, [])?)
    }

    fn close(self: Box<Self>) -> Result<(), DbError> {
        self.conn.close().map_err(|(_, e)| DbError::Sqlite(e))
    }
}
