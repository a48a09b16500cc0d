use crate::domain::{Course, CourseId, RatingError, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Store-assigned identifier for a review row.
pub type ReviewId = i64;

/// A star rating in `1..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: i64) -> Result<Self, RatingError> {
        if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(RatingError { value })
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Rating {
    type Error = RatingError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for i64 {
    fn from(rating: Rating) -> Self {
        i64::from(rating.0)
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One student's review of one course.
///
/// At most one review exists per (user, course) pair; edits and removals
/// address the row by that pair rather than by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    /// `None` until the review has been inserted.
    pub id: Option<ReviewId>,
    pub user_id: UserId,
    pub course_id: CourseId,
    pub rating: Rating,
    /// When the review was created or last edited.
    pub entry_time: DateTime<Utc>,
    pub comment: Option<String>,
}

impl Review {
    /// A new, unsaved review stamped with the current time.
    pub fn new(user_id: UserId, course_id: CourseId, rating: Rating, comment: Option<String>) -> Self {
        Self {
            id: None,
            user_id,
            course_id,
            rating,
            entry_time: Utc::now(),
            comment,
        }
    }
}

impl fmt::Display for Review {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Rating: {}/{}", self.rating, Rating::MAX)?;
        write!(f, "Date posted: {}", self.entry_time.format("%Y-%m-%d %H:%M:%S"))?;
        if let Some(comment) = self.comment.as_deref().filter(|c| !c.is_empty()) {
            write!(f, "\n{comment}")?;
        }
        Ok(())
    }
}

/// A review paired with the course it belongs to, for per-user listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewWithCourse {
    pub review: Review,
    pub course: Course,
}
