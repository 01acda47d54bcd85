//! Backing-store capability consumed by the session store

use rusqlite::{Connection, Row, ToSql};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::schema::SCHEMA;

/// Positional-parameter access to a pooled database.
///
/// `query` owns its statement for the duration of the call, so the cursor
/// is released on every exit path.
pub trait Pool {
    /// Run a statement, returning the number of affected rows.
    fn exec(&self, sql: &str, params: &[&dyn ToSql]) -> rusqlite::Result<usize>;

    /// Run a query and map every returned row.
    fn query<T, F>(&self, sql: &str, params: &[&dyn ToSql], f: F) -> rusqlite::Result<Vec<T>>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>;

    /// Run a query expected to return exactly one row.
    fn query_row<T, F>(&self, sql: &str, params: &[&dyn ToSql], f: F) -> rusqlite::Result<T>
    where
        F: FnOnce(&Row<'_>) -> rusqlite::Result<T>;
}

/// A single SQLite connection shared behind a mutex.
pub struct SqlitePool {
    conn: Mutex<Connection>,
}

impl SqlitePool {
    pub fn open(path: &Path, busy_timeout: Duration) -> rusqlite::Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> rusqlite::Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> rusqlite::Result<Self> {
        // Registers rarray(), used for batch lookups by id
        rusqlite::vtab::array::load_module(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create the `sessions` table if it does not exist yet.
    pub fn migrate(&self) -> rusqlite::Result<()> {
        self.lock().execute_batch(SCHEMA)?;
        tracing::debug!("sessions schema applied");
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // A panic mid-statement leaves the connection itself usable
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Pool for SqlitePool {
    fn exec(&self, sql: &str, params: &[&dyn ToSql]) -> rusqlite::Result<usize> {
        self.lock().execute(sql, params)
    }

    fn query<T, F>(&self, sql: &str, params: &[&dyn ToSql], f: F) -> rusqlite::Result<Vec<T>>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(sql)?;
        let rows = stmt.query_map(params, f)?;
        rows.collect()
    }

    fn query_row<T, F>(&self, sql: &str, params: &[&dyn ToSql], f: F) -> rusqlite::Result<T>
    where
        F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    {
        self.lock().query_row(sql, params, f)
    }
}

impl<P: Pool> Pool for &P {
    fn exec(&self, sql: &str, params: &[&dyn ToSql]) -> rusqlite::Result<usize> {
        (**self).exec(sql, params)
    }

    fn query<T, F>(&self, sql: &str, params: &[&dyn ToSql], f: F) -> rusqlite::Result<Vec<T>>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        (**self).query(sql, params, f)
    }

    fn query_row<T, F>(&self, sql: &str, params: &[&dyn ToSql], f: F) -> rusqlite::Result<T>
    where
        F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    {
        (**self).query_row(sql, params, f)
    }
}

impl<P: Pool> Pool for Arc<P> {
    fn exec(&self, sql: &str, params: &[&dyn ToSql]) -> rusqlite::Result<usize> {
        (**self).exec(sql, params)
    }

    fn query<T, F>(&self, sql: &str, params: &[&dyn ToSql], f: F) -> rusqlite::Result<Vec<T>>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        (**self).query(sql, params, f)
    }

    fn query_row<T, F>(&self, sql: &str, params: &[&dyn ToSql], f: F) -> rusqlite::Result<T>
    where
        F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    {
        (**self).query_row(sql, params, f)
    }
}
