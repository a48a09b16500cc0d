//! Table definitions for users, courses, and reviews.

use rusqlite::Connection;

/// True when the Users, Courses, and Reviews tables are all present.
pub(crate) fn tables_exist(conn: &Connection) -> rusqlite::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('Users', 'Courses', 'Reviews')",
        [],
        |row| row.get(0),
    )?;
    Ok(count == 3)
}

/// Create the three tables and their indexes if they are missing.
///
/// Safe to run on every startup; existing tables and rows are left alone.
pub(crate) fn create_tables(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS Users (
            ID INTEGER PRIMARY KEY AUTOINCREMENT,
            Username TEXT NOT NULL UNIQUE CHECK (length(Username) > 0),
            Password TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS Courses (
            ID INTEGER PRIMARY KEY AUTOINCREMENT,
            Subject TEXT NOT NULL,
            CourseNumber INTEGER NOT NULL,
            Title TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS Reviews (
            ID INTEGER PRIMARY KEY AUTOINCREMENT,
            UserID INTEGER NOT NULL,
            CourseID INTEGER NOT NULL,
            Rating INTEGER NOT NULL CHECK (Rating BETWEEN 1 AND 5),
            EntryTime TEXT NOT NULL,
            Comment TEXT,
            FOREIGN KEY(UserID) REFERENCES Users(ID) ON DELETE CASCADE,
            FOREIGN KEY(CourseID) REFERENCES Courses(ID) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_reviews_course_id ON Reviews(CourseID);
        CREATE INDEX IF NOT EXISTS idx_reviews_user_id ON Reviews(UserID);
        "#,
    )
}
