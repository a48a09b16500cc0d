//! SQLite connection and transaction management for the course review store.
//! Owns the single live connection, keeps it in manual-commit mode, and hands
//! out repositories that borrow it per call.

use super::error::{Result, StoreError};
use super::repository::{CourseRepository, DbConn, ReviewRepository, UserRepository};
use super::schema;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Location {
    File(PathBuf),
    Memory,
}

/// Database controller that manages one SQLite connection.
///
/// The controller starts disconnected. While connected, an explicit
/// transaction is always open: writes stay pending until [`Database::commit`]
/// and are discarded by [`Database::rollback`] or [`Database::disconnect`].
pub struct Database {
    location: Location,
    conn: DbConn,
}

impl Database {
    /// A disconnected controller for the database file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            location: Location::File(path.into()),
            conn: Arc::new(Mutex::new(None)),
        }
    }

    /// A disconnected controller for a private in-memory database. Each
    /// `connect` starts from an empty database.
    pub fn in_memory() -> Self {
        Self {
            location: Location::Memory,
            conn: Arc::new(Mutex::new(None)),
        }
    }

    /// Connect to the database at `path`, then create and commit the schema.
    pub fn open_at(path: impl Into<PathBuf>) -> Result<Self> {
        let db = Self::new(path);
        db.connect()?;
        db.create_tables()?;
        db.commit()?;
        Ok(db)
    }

    /// Connect to a fresh in-memory database, then create and commit the schema.
    pub fn open_in_memory() -> Result<Self> {
        let db = Self::in_memory();
        db.connect()?;
        db.create_tables()?;
        db.commit()?;
        Ok(db)
    }

    /// Path of the backing file, `None` for in-memory databases.
    pub fn path(&self) -> Option<&Path> {
        match &self.location {
            Location::File(path) => Some(path.as_path()),
            Location::Memory => None,
        }
    }

    /// Open the connection with foreign keys enforced and auto-commit off.
    ///
    /// An already open connection is closed first; its uncommitted work is lost.
    pub fn connect(&self) -> Result<()> {
        let mut guard = self.lock()?;
        if let Some(previous) = guard.take() {
            log::warn!("connect() called while connected; closing the previous connection");
            close(previous)?;
        }

        let conn = match &self.location {
            Location::File(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                Connection::open(path)?
            }
            Location::Memory => Connection::open_in_memory()?,
        };

        // foreign_keys is a no-op inside a transaction, so it must precede BEGIN.
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch("BEGIN;")?;

        match &self.location {
            Location::File(path) => log::info!("Opened database at {}", path.display()),
            Location::Memory => log::info!("Opened in-memory database"),
        }
        *guard = Some(conn);
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.lock().map(|guard| guard.is_some()).unwrap_or(false)
    }

    /// Make every write since the last commit/rollback durable.
    pub fn commit(&self) -> Result<()> {
        let mut guard = self.lock()?;
        finish_transaction(&mut guard, Finish::Commit)?;
        log::debug!("Committed transaction");
        Ok(())
    }

    /// Discard every write since the last commit/rollback.
    pub fn rollback(&self) -> Result<()> {
        let mut guard = self.lock()?;
        finish_transaction(&mut guard, Finish::Rollback)?;
        log::debug!("Rolled back transaction");
        Ok(())
    }

    /// Close the connection. Uncommitted writes are discarded.
    pub fn disconnect(&self) -> Result<()> {
        let mut guard = self.lock()?;
        let conn = guard.take().ok_or_else(StoreError::not_connected)?;
        close(conn)?;
        log::info!("Closed database connection");
        Ok(())
    }

    /// Ensure the Users, Courses, and Reviews tables exist.
    ///
    /// Does nothing when all three are already present. Otherwise the DDL runs
    /// inside the open transaction and becomes durable on the next commit.
    pub fn create_tables(&self) -> Result<()> {
        let mut guard = self.lock()?;
        let conn = guard.as_ref().ok_or_else(StoreError::not_connected)?;
        if schema::tables_exist(conn)? {
            log::debug!("Schema already present");
            return Ok(());
        }
        if let Err(err) = schema::create_tables(conn) {
            log::warn!("Schema creation failed, rolling back: {}", err);
            rollback_after_failure(&mut guard);
            return Err(err.into());
        }
        log::debug!("Schema created");
        Ok(())
    }

    /// Shared handle to the connection slot, for constructing repositories.
    pub fn connection(&self) -> DbConn {
        self.conn.clone()
    }

    pub fn user_repo(&self) -> UserRepository {
        UserRepository::new(self.connection())
    }

    pub fn course_repo(&self) -> CourseRepository {
        CourseRepository::new(self.connection())
    }

    pub fn review_repo(&self) -> ReviewRepository {
        ReviewRepository::new(self.connection())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Option<Connection>>> {
        lock_slot(&self.conn)
    }
}

pub(crate) fn lock_slot(conn: &DbConn) -> Result<MutexGuard<'_, Option<Connection>>> {
    conn.lock()
        .map_err(|_| StoreError::ConnectionState("Database lock poisoned".to_string()))
}

#[derive(Debug, Clone, Copy)]
enum Finish {
    Commit,
    Rollback,
}

/// End the open transaction and immediately begin the next one.
fn finish_transaction(slot: &mut Option<Connection>, finish: Finish) -> Result<()> {
    let conn = slot.as_ref().ok_or_else(StoreError::not_connected)?;
    // SQLite may already have rolled back on its own after some errors.
    if !conn.is_autocommit() {
        match finish {
            Finish::Commit => conn.execute_batch("COMMIT;")?,
            Finish::Rollback => conn.execute_batch("ROLLBACK;")?,
        }
    }
    begin_or_close(slot)
}

/// Open the next transaction. A connection that cannot leave autocommit
/// mode is closed, so later writes fail instead of committing one by one.
fn begin_or_close(slot: &mut Option<Connection>) -> Result<()> {
    let conn = slot.as_ref().ok_or_else(StoreError::not_connected)?;
    if let Err(err) = conn.execute_batch("BEGIN;") {
        log::error!("Could not begin a transaction, closing the connection: {}", err);
        if let Some(conn) = slot.take() {
            if let Err(close_err) = close(conn) {
                log::warn!("Closing the connection also failed: {}", close_err);
            }
        }
        return Err(StoreError::ConnectionState(format!(
            "Could not begin a new transaction: {err}"
        )));
    }
    Ok(())
}

/// Roll back after a failed write. Failures here are logged, not returned,
/// so the caller still sees the error that triggered the rollback.
pub(crate) fn rollback_after_failure(slot: &mut Option<Connection>) {
    if let Err(err) = finish_transaction(slot, Finish::Rollback) {
        log::error!("Rollback after storage failure also failed: {}", err);
    }
}

fn close(conn: Connection) -> Result<()> {
    conn.close().map_err(|(_, err)| StoreError::Storage(err))
}
