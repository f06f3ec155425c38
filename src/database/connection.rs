use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

use super::DbError;

// ============================================================================
// Driver session
// ============================================================================

/// A live session with one database, implemented per driver.
///
/// Calls block; steps only invoke them from a background worker.
pub trait DbSession: Send {
    fn begin_transaction(&mut self) -> Result<(), DbError>;
    fn commit(&mut self) -> Result<(), DbError>;
    fn rollback(&mut self) -> Result<(), DbError>;
    fn in_transaction(&self) -> bool;
    /// Run a statement and return the number of affected rows.
    fn execute(&mut self, sql: &str) -> Result<usize, DbError>;
    fn close(self: Box<Self>) -> Result<(), DbError>;
}

// ============================================================================
// DatabaseConnection
// ============================================================================

/// Shared reference to an open session.
///
/// Cloning yields another reference to the same session; use
/// [`DatabaseConnection::same_instance`] to compare identity.
#[derive(Clone)]
pub struct DatabaseConnection {
    inner: Arc<Shared>,
}

struct Shared {
    id: Uuid,
    provider: String,
    opened_at: DateTime<Utc>,
    session: Mutex<Option<Box<dyn DbSession>>>,
}

impl DatabaseConnection {
    pub fn new(provider: impl Into<String>, session: Box<dyn DbSession>) -> Self {
        Self {
            inner: Arc::new(Shared {
                id: Uuid::new_v4(),
                provider: provider.into(),
                opened_at: Utc::now(),
                session: Mutex::new(Some(session)),
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn provider(&self) -> &str {
        &self.inner.provider
    }

    pub fn opened_at(&self) -> DateTime<Utc> {
        self.inner.opened_at
    }

    pub fn same_instance(&self, other: &DatabaseConnection) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn is_open(&self) -> bool {
        self.inner.session.lock().is_some()
    }

    pub fn in_transaction(&self) -> bool {
        self.inner
            .session
            .lock()
            .as_ref()
            .is_some_and(|s| s.in_transaction())
    }

    pub fn begin_transaction(&self) -> Result<(), DbError> {
        self.with_session(|s| s.begin_transaction())
    }

    pub fn commit(&self) -> Result<(), DbError> {
        self.with_session(|s| s.commit())
    }

    pub fn rollback(&self) -> Result<(), DbError> {
        self.with_session(|s| s.rollback())
    }

    pub fn execute(&self, sql: &str) -> Result<usize, DbError> {
        self.with_session(|s| s.execute(sql))
    }

    /// Close the session. Closing twice is a no-op.
    pub(crate) fn close(&self) -> Result<(), DbError> {
        let session = self.inner.session.lock().take();
        match session {
            Some(session) => session.close(),
            None => Ok(()),
        }
    }

    fn with_session<T>(
        &self,
        f: impl FnOnce(&mut dyn DbSession) -> Result<T, DbError>,
    ) -> Result<T, DbError> {
        let mut guard = self.inner.session.lock();
        let session = guard.as_mut().ok_or(DbError::Closed)?;
        f(session.as_mut())
    }
}

impl fmt::Debug for DatabaseConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConnection")
            .field("id", &self.inner.id)
            .field("provider", &self.inner.provider)
            .field("open", &self.is_open())
            .finish()
    }
}

// ============================================================================
// ConnectionHandle
// ============================================================================

/// A connection together with who is allowed to close it.
///
/// Cloning never duplicates ownership: every clone is `Borrowed`.
#[derive(Debug)]
pub enum ConnectionHandle {
    /// Created by the step that produced this handle.
    Owned(DatabaseConnection),
    /// Supplied from outside; the holder must not close it.
    Borrowed(DatabaseConnection),
}

impl Clone for ConnectionHandle {
    fn clone(&self) -> Self {
        self.borrowed()
    }
}

impl ConnectionHandle {
    pub fn connection(&self) -> &DatabaseConnection {
        match self {
            ConnectionHandle::Owned(c) | ConnectionHandle::Borrowed(c) => c,
        }
    }

    pub fn is_owned(&self) -> bool {
        matches!(self, ConnectionHandle::Owned(_))
    }

    pub fn in_transaction(&self) -> bool {
        self.connection().in_transaction()
    }

    /// A borrowed view of the same connection, for passing to later steps.
    pub fn borrowed(&self) -> ConnectionHandle {
        ConnectionHandle::Borrowed(self.connection().clone())
    }

    pub fn close(self) -> Result<(), DbError> {
        match self {
            ConnectionHandle::Owned(c) => c.close(),
            ConnectionHandle::Borrowed(_) => Err(DbError::NotOwner),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// In-memory session that records transaction state.
    #[derive(Default)]
    pub(crate) struct FakeSession {
        pub in_tx: bool,
        pub closed: Arc<AtomicBool>,
    }

    impl DbSession for FakeSession {
        fn begin_transaction(&mut self) -> Result<(), DbError> {
            if self.in_tx {
                return Err(DbError::Driver("transaction already active".into()));
            }
            self.in_tx = true;
            Ok(())
        }

        fn commit(&mut self) -> Result<(), DbError> {
            self.in_tx = false;
            Ok(())
        }

        fn rollback(&mut self) -> Result<(), DbError> {
            self.in_tx = false;
            Ok(())
        }

        fn in_transaction(&self) -> bool {
            self.in_tx
        }

        fn execute(&mut self, _sql: &str) -> Result<usize, DbError> {
            Ok(0)
        }

        fn close(self: Box<Self>) -> Result<(), DbError> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn clones_share_identity_and_state() {
        let conn = DatabaseConnection::new("fake", Box::<FakeSession>::default());
        let other = conn.clone();
        assert!(conn.same_instance(&other));
        conn.begin_transaction().unwrap();
        assert!(other.in_transaction());

        let unrelated = DatabaseConnection::new("fake", Box::<FakeSession>::default());
        assert!(!conn.same_instance(&unrelated));
    }

    #[test]
    fn borrowed_handle_cannot_close() {
        let closed = Arc::new(AtomicBool::new(false));
        let session = FakeSession {
            closed: closed.clone(),
            ..Default::default()
        };
        let owned = ConnectionHandle::Owned(DatabaseConnection::new("fake", Box::new(session)));

        let err = owned.borrowed().close().unwrap_err();
        assert!(matches!(err, DbError::NotOwner));
        assert!(owned.connection().is_open());

        let conn = owned.connection().clone();
        owned.close().unwrap();
        assert!(closed.load(Ordering::SeqCst));
        assert!(!conn.is_open());
        assert!(matches!(conn.execute("select 1"), Err(DbError::Closed)));
    }

    #[test]
    fn cloned_owned_handle_is_borrowed() {
        let owned = ConnectionHandle::Owned(DatabaseConnection::new("fake", Box::<FakeSession>::default()));
        let copy = owned.clone();

        assert!(owned.is_owned());
        assert!(!copy.is_owned());
        assert!(copy.connection().same_instance(owned.connection()));
        assert!(matches!(copy.close(), Err(DbError::NotOwner)));
        assert!(owned.connection().is_open());
    }

    #[test]
    fn debug_shows_provider_not_session() {
        let conn = DatabaseConnection::new("fake", Box::<FakeSession>::default());
        let rendered = format!("{conn:?}");
        assert!(rendered.contains("fake"));
        assert!(rendered.contains("open: true"));
    }
}
