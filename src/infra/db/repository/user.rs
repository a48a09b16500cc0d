use super::{DbConn, with_conn, with_write};
use crate::domain::{User, UserId};
use crate::infra::credentials::{Argon2Hasher, CredentialHasher, PasswordHash};
use crate::infra::db::error::{Result, StoreError};
use crate::infra::db::rows::{USER_COLUMNS, UserRow};
use rusqlite::{Connection, OptionalExtension};
use std::sync::Arc;

/// Repository for user identity and credentials.
pub struct UserRepository {
    conn: DbConn,
    hasher: Arc<dyn CredentialHasher>,
}

impl UserRepository {
    pub fn new(conn: DbConn) -> Self {
        Self::with_hasher(conn, Arc::new(Argon2Hasher::default()))
    }

    pub fn with_hasher(conn: DbConn, hasher: Arc<dyn CredentialHasher>) -> Self {
        Self { conn, hasher }
    }

    /// Insert `user` with a hash of `password` and record the generated id on it.
    pub fn add_user(&self, user: &mut User, password: &str) -> Result<UserId> {
        let stored = self.hasher.hash(password)?;
        let id = with_write(&self.conn, "add_user", |conn| {
            conn.execute(
                "INSERT INTO Users (Username, Password) VALUES (?1, ?2)",
                (&user.username, stored.as_str()),
            )?;
            Ok(conn.last_insert_rowid())
        })?;
        user.id = Some(id);
        log::debug!("Added user {} with id {}", user.username, id);
        Ok(id)
    }

    pub fn user_exists(&self, username: &str) -> Result<bool> {
        with_conn(&self.conn, |conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM Users WHERE Username = ?1)",
                [username],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
    }

    /// Id for `username`; `NotFound` when no such user exists.
    pub fn get_user_id(&self, username: &str) -> Result<UserId> {
        with_conn(&self.conn, |conn| resolve_user_id(conn, username))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        with_conn(&self.conn, |conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {USER_COLUMNS} FROM Users WHERE Username = ?1"),
                    [username],
                    UserRow::from_row,
                )
                .optional()?;
            Ok(row.map(User::from))
        })
    }

    /// The stored credential for `user`, looked up by username.
    pub fn get_password_for_user(&self, user: &User) -> Result<Option<PasswordHash>> {
        with_conn(&self.conn, |conn| {
            let stored: Option<String> = conn
                .query_row(
                    "SELECT Password FROM Users WHERE Username = ?1",
                    [&user.username],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(stored.map(PasswordHash::from_stored))
        })
    }

    /// The user when `password` matches the stored credential, `None` for an
    /// unknown username or a wrong password.
    pub fn verify_credentials(&self, username: &str, password: &str) -> Result<Option<User>> {
        let Some(user) = self.get_user_by_username(username)? else {
            return Ok(None);
        };
        let Some(stored) = self.get_password_for_user(&user)? else {
            return Ok(None);
        };
        if self.hasher.verify(password, &stored) {
            Ok(Some(user))
        } else {
            log::debug!("Credential check failed for {}", username);
            Ok(None)
        }
    }
}

/// Natural-key lookup shared with the review repository.
pub(super) fn resolve_user_id(conn: &Connection, username: &str) -> Result<UserId> {
    conn.query_row(
        "SELECT ID FROM Users WHERE Username = ?1",
        [username],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| StoreError::not_found("User", username))
}
