//! SQLite persistence for users, courses, and reviews.

pub mod database;
pub mod error;
pub mod repository;
pub(crate) mod rows;
mod schema;

pub use database::Database;
pub use error::{Result, StoreError};
pub use repository::{CourseRepository, DbConn, ReviewRepository, UserRepository};
