use super::{DbConn, with_conn, with_write};
use crate::domain::{Course, CourseId, CourseKey, CourseQuery};
use crate::infra::db::error::{Result, StoreError};
use crate::infra::db::rows::{COURSE_GROUPING, COURSE_WITH_RATING_SELECT, CourseRow};
use rusqlite::{Connection, OptionalExtension};

/// Repository for the course catalog.
///
/// The store does not enforce natural-key uniqueness; callers check
/// [`CourseRepository::course_already_exists`] (or
/// [`CourseRepository::ensure_course_absent`]) before adding.
pub struct CourseRepository {
    conn: DbConn,
}

impl CourseRepository {
    pub fn new(conn: DbConn) -> Self {
        Self { conn }
    }

    /// Insert a course and return its generated id.
    pub fn add_course(&self, subject: &str, course_number: u32, title: &str) -> Result<CourseId> {
        let id = with_write(&self.conn, "add_course", |conn| {
            conn.execute(
                "INSERT INTO Courses (Subject, CourseNumber, Title) VALUES (?1, ?2, ?3)",
                (subject, course_number, title),
            )?;
            Ok(conn.last_insert_rowid())
        })?;
        log::debug!("Added course {} {} with id {}", subject, course_number, id);
        Ok(id)
    }

    /// True when a course with exactly this subject, number, and title exists.
    pub fn course_already_exists(
        &self,
        subject: &str,
        course_number: u32,
        title: &str,
    ) -> Result<bool> {
        with_conn(&self.conn, |conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM Courses WHERE Subject = ?1 AND CourseNumber = ?2 AND Title = ?3)",
                (subject, course_number, title),
                |row| row.get(0),
            )?;
            Ok(exists)
        })
    }

    /// `Duplicate` when the course already exists, `Ok(())` otherwise.
    pub fn ensure_course_absent(&self, subject: &str, course_number: u32, title: &str) -> Result<()> {
        if self.course_already_exists(subject, course_number, title)? {
            return Err(StoreError::Duplicate {
                entity: "Course",
                key: CourseKey::new(subject, course_number, title).to_string(),
            });
        }
        Ok(())
    }

    pub fn get_course_by_id(&self, id: CourseId) -> Result<Option<Course>> {
        with_conn(&self.conn, |conn| {
            let row = conn
                .query_row(
                    &format!("{COURSE_WITH_RATING_SELECT} WHERE c.ID = ?1{COURSE_GROUPING}"),
                    [id],
                    CourseRow::from_row,
                )
                .optional()?;
            Ok(row.map(Course::from))
        })
    }

    /// Id of the course matching the natural key; `NotFound` if none does.
    pub fn get_course_id(&self, subject: &str, course_number: u32, title: &str) -> Result<CourseId> {
        with_conn(&self.conn, |conn| {
            resolve_course_id(conn, &CourseKey::new(subject, course_number, title))
        })
    }

    /// Every course with its rounded average rating, in insertion order.
    pub fn get_all_courses_with_ratings(&self) -> Result<Vec<Course>> {
        with_conn(&self.conn, |conn| {
            let mut stmt = conn.prepare(&format!("{COURSE_WITH_RATING_SELECT}{COURSE_GROUPING}"))?;
            let rows = stmt.query_map([], CourseRow::from_row)?;
            let courses = rows
                .map(|row| row.map(Course::from))
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(courses)
        })
    }

    /// Courses matching `query`; the whole catalog when the query is empty.
    pub fn search_courses(&self, query: &CourseQuery) -> Result<Vec<Course>> {
        let catalog = self.get_all_courses_with_ratings()?;
        Ok(query.apply(catalog))
    }
}

/// Natural-key lookup shared with the review repository.
pub(super) fn resolve_course_id(conn: &Connection, key: &CourseKey) -> Result<CourseId> {
    conn.query_row(
        "SELECT ID FROM Courses WHERE Subject = ?1 AND CourseNumber = ?2 AND Title = ?3 ORDER BY ID LIMIT 1",
        (&key.subject, key.course_number, &key.title),
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| StoreError::not_found("Course", key))
}
