//! Domain types for the course review store.
//! Users, catalog courses, reviews, and the pure catalog search logic.

pub mod course;
pub mod error;
pub mod review;
pub mod user;

pub use course::*;
pub use error::*;
pub use review::*;
pub use user::*;
