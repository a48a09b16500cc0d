use serde::{Deserialize, Serialize};
use std::fmt;

/// Store-assigned identifier for a course row.
pub type CourseId = i64;

/// The (subject, course number, title) triple that identifies a course
/// independently of its generated id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CourseKey {
    /// Two to four uppercase letters, e.g. `CS`.
    pub subject: String,
    /// Four-digit catalog number, e.g. `2150`.
    pub course_number: u32,
    /// At most 50 characters.
    pub title: String,
}

impl CourseKey {
    pub fn new(subject: impl Into<String>, course_number: u32, title: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            course_number,
            title: title.into(),
        }
    }
}

impl fmt::Display for CourseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.subject, self.course_number, self.title)
    }
}

/// A catalog entry together with its derived average rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub subject: String,
    pub course_number: u32,
    pub title: String,
    /// Mean of all review ratings rounded to two decimals; `None` when the
    /// course has no reviews.
    pub average_rating: Option<f64>,
}

impl Course {
    pub fn key(&self) -> CourseKey {
        CourseKey::new(self.subject.clone(), self.course_number, self.title.clone())
    }
}

impl fmt::Display for Course {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.subject, self.course_number, self.title)?;
        if let Some(rating) = self.average_rating {
            write!(f, " - Avg Rating: {rating:.2}")?;
        }
        Ok(())
    }
}

/// Round a mean rating to two decimal places.
pub fn round_rating(mean: f64) -> f64 {
    (mean * 100.0).round() / 100.0
}

/// Optional filters applied to the catalog.
///
/// Empty strings are treated the same as absent filters so callers can pass
/// raw form input straight through.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseQuery {
    /// Exact subject match.
    pub subject: Option<String>,
    /// Exact course number match.
    pub course_number: Option<u32>,
    /// Case-insensitive substring of the title.
    pub title: Option<String>,
}

impl CourseQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn course_number(mut self, course_number: u32) -> Self {
        self.course_number = Some(course_number);
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    fn subject_filter(&self) -> Option<&str> {
        self.subject.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    fn title_filter(&self) -> Option<String> {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }

    /// True when no filter is set.
    pub fn is_empty(&self) -> bool {
        self.subject_filter().is_none()
            && self.course_number.is_none()
            && self.title_filter().is_none()
    }

    /// Narrow `catalog` down to the courses matching every supplied filter.
    ///
    /// An empty query returns the catalog untouched. Otherwise filters run in
    /// order subject, title, course number; the result is sorted by course
    /// number (stable, so storage order breaks ties) and duplicates are
    /// dropped.
    pub fn apply(&self, catalog: Vec<Course>) -> Vec<Course> {
        if self.is_empty() {
            return catalog;
        }

        let mut matches = catalog;
        if let Some(subject) = self.subject_filter() {
            matches.retain(|course| course.subject == subject);
        }
        if let Some(needle) = self.title_filter() {
            matches.retain(|course| course.title.to_lowercase().contains(&needle));
        }
        if let Some(number) = self.course_number {
            matches.retain(|course| course.course_number == number);
        }

        matches.sort_by_key(|course| course.course_number);

        let mut unique: Vec<Course> = Vec::with_capacity(matches.len());
        for course in matches {
            if !unique.contains(&course) {
                unique.push(course);
            }
        }
        unique
    }
}
