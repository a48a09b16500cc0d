use serde::{Deserialize, Serialize};

/// Store-assigned identifier for a user row.
pub type UserId = i64;

/// A registered student.
///
/// Credentials are not carried on the entity; they stay in the store and are
/// only reachable through the user repository's credential operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// `None` until the user has been inserted.
    pub id: Option<UserId>,
    pub username: String,
}

impl User {
    /// A user that has not been persisted yet.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            id: None,
            username: username.into(),
        }
    }
}
