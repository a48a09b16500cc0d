//! Error type for the persistence layer.

use crate::infra::credentials::CredentialError;
use thiserror::Error;

/// Failures raised by the database controller and repositories.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The operation needs an open connection and there is none, or the
    /// shared handle is unusable.
    #[error("Connection state error: {0}")]
    ConnectionState(String),

    /// A natural-key lookup matched no row, or an edit/remove touched no row.
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// The caller asked for a uniqueness check and the row already exists.
    #[error("Duplicate {entity}: {key}")]
    Duplicate { entity: &'static str, key: String },

    /// Any failure reported by SQLite.
    #[error("Storage failure: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error("Failed to prepare database location: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub(crate) fn not_connected() -> Self {
        Self::ConnectionState("The connection is not opened".to_string())
    }

    pub(crate) fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_connection_state(&self) -> bool {
        matches!(self, Self::ConnectionState(_))
    }
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;
