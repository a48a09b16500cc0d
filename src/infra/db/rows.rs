//! Plain row structures read out of SQLite.
//!
//! Each row type is built once from a `rusqlite::Row` by position and then
//! converted into its domain entity, so column names never leak past this
//! module and the repositories.

use crate::domain::{Course, CourseId, Rating, Review, ReviewId, User, UserId, round_rating};
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::Row;
use rusqlite::types::Type;

pub(crate) const USER_COLUMNS: &str = "ID, Username";

pub(crate) const REVIEW_COLUMNS: &str = "r.ID, r.UserID, r.CourseID, r.Rating, r.EntryTime, r.Comment";

/// Courses joined with the mean of their review ratings. Append a `WHERE`
/// clause if needed, then [`COURSE_GROUPING`].
pub(crate) const COURSE_WITH_RATING_SELECT: &str = r#"
    SELECT c.ID, c.Subject, c.CourseNumber, c.Title, AVG(r.Rating)
    FROM Courses c
    LEFT JOIN Reviews r ON r.CourseID = c.ID
"#;

pub(crate) const COURSE_GROUPING: &str = " GROUP BY c.ID ORDER BY c.ID";

#[derive(Debug, Clone)]
pub(crate) struct UserRow {
    id: UserId,
    username: String,
}

impl UserRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            username: row.get(1)?,
        })
    }
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: Some(row.id),
            username: row.username,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct CourseRow {
    id: CourseId,
    subject: String,
    course_number: u32,
    title: String,
    mean_rating: Option<f64>,
}

impl CourseRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Self::from_row_at(row, 0)
    }

    pub(crate) fn from_row_at(row: &Row<'_>, start: usize) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(start)?,
            subject: row.get(start + 1)?,
            course_number: row.get(start + 2)?,
            title: row.get(start + 3)?,
            mean_rating: row.get(start + 4)?,
        })
    }
}

impl From<CourseRow> for Course {
    fn from(row: CourseRow) -> Self {
        Course {
            id: row.id,
            subject: row.subject,
            course_number: row.course_number,
            title: row.title,
            average_rating: row.mean_rating.map(round_rating),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ReviewRow {
    id: ReviewId,
    user_id: UserId,
    course_id: CourseId,
    rating: Rating,
    entry_time: DateTime<Utc>,
    comment: Option<String>,
}

impl ReviewRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let raw_rating: i64 = row.get(3)?;
        let rating = Rating::new(raw_rating)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Integer, Box::new(e)))?;
        let raw_time: String = row.get(4)?;
        let entry_time = parse_entry_time(&raw_time).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e))
        })?;

        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            course_id: row.get(2)?,
            rating,
            entry_time,
            comment: row.get(5)?,
        })
    }
}

impl From<ReviewRow> for Review {
    fn from(row: ReviewRow) -> Self {
        Review {
            id: Some(row.id),
            user_id: row.user_id,
            course_id: row.course_id,
            rating: row.rating,
            entry_time: row.entry_time,
            comment: row.comment,
        }
    }
}

/// Format used for the `EntryTime` column.
pub(crate) fn format_entry_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339()
}

/// Accepts RFC 3339 and SQLite's `CURRENT_TIMESTAMP` layout (read as UTC).
fn parse_entry_time(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(time) => Ok(time.with_timezone(&Utc)),
        Err(rfc_err) => NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(|_| rfc_err),
    }
}
