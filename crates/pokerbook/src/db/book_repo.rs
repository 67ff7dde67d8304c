//! Book repository: rows of the `books` table.

use rusqlite::{params, OptionalExtension, Row};

use super::models::BookStatus;
use super::{now, Database, DatabaseError};

#[derive(Debug, Clone)]
pub struct BookRow {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub status: BookStatus,
    pub created_at: String,
}

impl BookRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            title: row.get("title")?,
            description: row.get("description")?,
            status: row.get("status")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Inserts a book with status `new` and returns its id.
pub fn insert(db: &Database, title: &str, description: &str) -> Result<i64, DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO books (title, description, status, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![title, description, BookStatus::New, now()],
        )?;
        Ok(conn.last_insert_rowid())
    })
}

pub fn find_by_id(db: &Database, id: i64) -> Result<Option<BookRow>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row(
                "SELECT * FROM books WHERE id = ?1",
                params![id],
                BookRow::from_row,
            )
            .optional()?;
        Ok(row)
    })
}

/// Sets the status of a book. Returns `true` if the book exists.
pub fn update_status(db: &Database, id: i64, status: BookStatus) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE books SET status = ?2 WHERE id = ?1",
            params![id, status],
        )?;
        Ok(changed > 0)
    })
}

/// All books, newest first.
pub fn list(db: &Database) -> Result<Vec<BookRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM books ORDER BY created_at DESC, id DESC")?;
        let rows = stmt
            .query_map([], BookRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}
