use super::course::resolve_course_id;
use super::user::resolve_user_id;
use super::{DbConn, with_conn, with_write};
use crate::domain::{
    Course, CourseId, Rating, Review, ReviewId, ReviewWithCourse, User, UserId, round_rating,
};
use crate::infra::db::error::{Result, StoreError};
use crate::infra::db::rows::{CourseRow, REVIEW_COLUMNS, ReviewRow, format_entry_time};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};

/// Repository for course reviews.
///
/// A review is addressed by its (user, course) pair. The store has no
/// composite unique key, so at most one review per pair holds only as long
/// as callers look the pair up before adding; [`ReviewRepository::submit_review`]
/// does that for them.
pub struct ReviewRepository {
    conn: DbConn,
}

impl ReviewRepository {
    pub fn new(conn: DbConn) -> Self {
        Self { conn }
    }

    /// Insert `review` as a new row and return its generated id.
    pub fn add_review(&self, review: &Review) -> Result<ReviewId> {
        let id = with_write(&self.conn, "add_review", |conn| insert(conn, review))?;
        log::debug!(
            "Added review {} for user {} on course {}",
            id,
            review.user_id,
            review.course_id
        );
        Ok(id)
    }

    /// The review `user` left on `course`, if any.
    pub fn get_review_from_user_for_course(
        &self,
        user: &User,
        course: &Course,
    ) -> Result<Option<Review>> {
        with_conn(&self.conn, |conn| {
            let user_id = resolve_user_id(conn, &user.username)?;
            let course_id = resolve_course_id(conn, &course.key())?;
            find_pair(conn, user_id, course_id)
        })
    }

    /// Overwrite rating, entry time, and comment of the row identified by the
    /// (user, course) pair of `old`.
    pub fn edit_review(&self, old: &Review, new: &Review) -> Result<()> {
        with_write(&self.conn, "edit_review", |conn| {
            update_pair(conn, old.user_id, old.course_id, new)
        })
    }

    /// Delete the review `user` left on `course`; `NotFound` if there is none.
    pub fn remove_review(&self, course: &Course, user: &User) -> Result<()> {
        with_write(&self.conn, "remove_review", |conn| {
            let user_id = resolve_user_id(conn, &user.username)?;
            let course_id = resolve_course_id(conn, &course.key())?;
            let affected = conn.execute(
                "DELETE FROM Reviews WHERE CourseID = ?1 AND UserID = ?2",
                (course_id, user_id),
            )?;
            if affected == 0 {
                return Err(pair_not_found(user_id, course_id));
            }
            Ok(())
        })
    }

    /// Create the review for (user, course), or edit it if one already exists.
    ///
    /// The entry time is set to now. The caller still commits.
    pub fn submit_review(
        &self,
        user: &User,
        course: &Course,
        rating: Rating,
        comment: Option<String>,
    ) -> Result<Review> {
        with_write(&self.conn, "submit_review", |conn| {
            let user_id = resolve_user_id(conn, &user.username)?;
            let course_id = resolve_course_id(conn, &course.key())?;
            let mut review = Review {
                id: None,
                user_id,
                course_id,
                rating,
                entry_time: Utc::now(),
                comment,
            };

            match find_pair(conn, user_id, course_id)? {
                Some(existing) => {
                    update_pair(conn, user_id, course_id, &review)?;
                    review.id = existing.id;
                    log::debug!("Edited review for user {} on course {}", user_id, course_id);
                }
                None => {
                    review.id = Some(insert(conn, &review)?);
                    log::debug!("Added review for user {} on course {}", user_id, course_id);
                }
            }
            Ok(review)
        })
    }

    pub fn get_reviews_for_course(&self, course: &Course) -> Result<Vec<Review>> {
        with_conn(&self.conn, |conn| {
            let course_id = resolve_course_id(conn, &course.key())?;
            list_reviews(conn, "r.CourseID", course_id)
        })
    }

    pub fn get_reviews_from_user(&self, user: &User) -> Result<Vec<Review>> {
        with_conn(&self.conn, |conn| {
            let user_id = resolve_user_id(conn, &user.username)?;
            list_reviews(conn, "r.UserID", user_id)
        })
    }

    /// Every review by `user`, each paired with its course and that course's
    /// current average rating.
    pub fn get_reviews_from_user_with_courses(&self, user: &User) -> Result<Vec<ReviewWithCourse>> {
        with_conn(&self.conn, |conn| {
            let user_id = resolve_user_id(conn, &user.username)?;
            let mut stmt = conn.prepare(&format!(
                r#"
                SELECT {REVIEW_COLUMNS},
                       c.ID, c.Subject, c.CourseNumber, c.Title,
                       (SELECT AVG(Rating) FROM Reviews WHERE CourseID = c.ID)
                FROM Reviews r
                JOIN Courses c ON c.ID = r.CourseID
                WHERE r.UserID = ?1
                ORDER BY r.ID
                "#
            ))?;
            let rows = stmt.query_map([user_id], |row| {
                Ok(ReviewWithCourse {
                    review: ReviewRow::from_row(row)?.into(),
                    course: CourseRow::from_row_at(row, 6)?.into(),
                })
            })?;
            let reviews = rows.collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(reviews)
        })
    }

    /// Mean rating for `course` rounded to two decimals; `None` when the
    /// course has no reviews.
    pub fn calculate_average_review_for_course(&self, course: &Course) -> Result<Option<f64>> {
        with_conn(&self.conn, |conn| {
            let course_id = resolve_course_id(conn, &course.key())?;
            let mean: Option<f64> = conn.query_row(
                "SELECT AVG(Rating) FROM Reviews WHERE CourseID = ?1",
                [course_id],
                |row| row.get(0),
            )?;
            Ok(mean.map(round_rating))
        })
    }
}

fn insert(conn: &Connection, review: &Review) -> Result<ReviewId> {
    conn.execute(
        "INSERT INTO Reviews (UserID, CourseID, Rating, EntryTime, Comment) VALUES (?1, ?2, ?3, ?4, ?5)",
        (
            review.user_id,
            review.course_id,
            i64::from(review.rating),
            format_entry_time(&review.entry_time),
            review.comment.as_deref(),
        ),
    )?;
    Ok(conn.last_insert_rowid())
}

fn update_pair(conn: &Connection, user_id: UserId, course_id: CourseId, new: &Review) -> Result<()> {
    let affected = conn.execute(
        "UPDATE Reviews SET Rating = ?1, EntryTime = ?2, Comment = ?3 WHERE CourseID = ?4 AND UserID = ?5",
        (
            i64::from(new.rating),
            format_entry_time(&new.entry_time),
            new.comment.as_deref(),
            course_id,
            user_id,
        ),
    )?;
    if affected == 0 {
        return Err(pair_not_found(user_id, course_id));
    }
    Ok(())
}

fn find_pair(conn: &Connection, user_id: UserId, course_id: CourseId) -> Result<Option<Review>> {
    let row = conn
        .query_row(
            &format!(
                "SELECT {REVIEW_COLUMNS} FROM Reviews r WHERE r.UserID = ?1 AND r.CourseID = ?2 ORDER BY r.ID LIMIT 1"
            ),
            (user_id, course_id),
            ReviewRow::from_row,
        )
        .optional()?;
    Ok(row.map(Review::from))
}

/// `column` is one of the fixed filter columns above, never caller input.
fn list_reviews(conn: &Connection, column: &str, id: i64) -> Result<Vec<Review>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {REVIEW_COLUMNS} FROM Reviews r WHERE {column} = ?1 ORDER BY r.ID"
    ))?;
    let rows = stmt.query_map([id], ReviewRow::from_row)?;
    let reviews = rows
        .map(|row| row.map(Review::from))
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(reviews)
}

fn pair_not_found(user_id: UserId, course_id: CourseId) -> StoreError {
    StoreError::not_found("Review", format!("user {user_id}, course {course_id}"))
}
