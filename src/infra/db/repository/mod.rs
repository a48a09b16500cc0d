//! Repository implementations for users, courses, and reviews.
//!
//! Repositories share the controller's connection slot and lock it only for
//! the duration of a single call.

mod course;
mod review;
mod user;

pub use course::CourseRepository;
pub use review::ReviewRepository;
pub use user::UserRepository;

use super::database::{lock_slot, rollback_after_failure};
use super::error::{Result, StoreError};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

/// The controller's connection slot; `None` while disconnected.
pub type DbConn = Arc<Mutex<Option<Connection>>>;

/// Run a read against the open connection.
pub(super) fn with_conn<T>(conn: &DbConn, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
    let guard = lock_slot(conn)?;
    let conn = guard.as_ref().ok_or_else(StoreError::not_connected)?;
    f(conn)
}

/// Run a write against the open connection, rolling the transaction back if
/// SQLite reports a failure.
pub(super) fn with_write<T>(
    conn: &DbConn,
    operation: &str,
    f: impl FnOnce(&Connection) -> Result<T>,
) -> Result<T> {
    let mut guard = lock_slot(conn)?;
    let result = f(guard.as_ref().ok_or_else(StoreError::not_connected)?);
    match result {
        Err(StoreError::Storage(err)) => {
            log::warn!("{} failed, rolling back: {}", operation, err);
            rollback_after_failure(&mut guard);
            Err(StoreError::Storage(err))
        }
        other => other,
    }
}

#[cfg(test)]
mod tests;
