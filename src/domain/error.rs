//! Domain error types for the course review store.
//!
//! These errors describe values that can never be represented by the domain
//! types. Storage and connection failures live with the persistence layer in
//! [`crate::infra::db::StoreError`].

use thiserror::Error;

/// A rating outside the accepted `1..=5` range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Rating must be between 1 and 5, got {value}")]
pub struct RatingError {
    pub value: i64,
}
