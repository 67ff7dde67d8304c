//! Job repository: processing jobs and the combined job/book status
//! transitions.
//!
//! `completed_at` is set exactly when a job enters a terminal status and is
//! cleared when a job is (re)started.

use rusqlite::{params, OptionalExtension, Row};

use super::models::{BookStatus, JobStatus};
use super::{now, Database, DatabaseError};

#[derive(Debug, Clone)]
pub struct JobRow {
    pub id: i64,
    pub book_id: i64,
    pub status: JobStatus,
    pub created_at: String,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub error_message: Option<String>,
    pub result_source_path: Option<String>,
    pub result_russian_path: Option<String>,
}

impl JobRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            book_id: row.get("book_id")?,
            status: row.get("status")?,
            created_at: row.get("created_at")?,
            started_at: row.get("started_at")?,
            completed_at: row.get("completed_at")?,
            error_message: row.get("error_message")?,
            result_source_path: row.get("result_source_path")?,
            result_russian_path: row.get("result_russian_path")?,
        })
    }
}

/// Creates a `queued` job for a book and returns its id.
pub fn insert(db: &Database, book_id: i64) -> Result<i64, DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO jobs (book_id, status, created_at) VALUES (?1, ?2, ?3)",
            params![book_id, JobStatus::Queued, now()],
        )?;
        Ok(conn.last_insert_rowid())
    })
}

pub fn find_by_id(db: &Database, id: i64) -> Result<Option<JobRow>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row(
                "SELECT * FROM jobs WHERE id = ?1",
                params![id],
                JobRow::from_row,
            )
            .optional()?;
        Ok(row)
    })
}

/// The most recently created job of a book.
pub fn latest_for_book(db: &Database, book_id: i64) -> Result<Option<JobRow>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row(
                "SELECT * FROM jobs WHERE book_id = ?1 ORDER BY id DESC LIMIT 1",
                params![book_id],
                JobRow::from_row,
            )
            .optional()?;
        Ok(row)
    })
}

/// Moves the job and its book to `processing` in one transaction.
pub fn start(db: &Database, job_id: i64, book_id: i64) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        let tx = conn.unchecked_transaction()?;
        let updated = tx.execute(
            "UPDATE jobs SET status = ?2, started_at = ?3, completed_at = NULL,
             error_message = NULL, result_source_path = NULL, result_russian_path = NULL
             WHERE id = ?1",
            params![job_id, JobStatus::Processing, now()],
        )?;
        if updated == 0 {
            return Err(DatabaseError::MissingRow {
                table: "jobs",
                id: job_id,
            });
        }
        tx.execute(
            "UPDATE books SET status = ?2 WHERE id = ?1",
            params![book_id, BookStatus::Processing],
        )?;
        tx.commit()?;
        Ok(())
    })
}

/// Marks the job `completed` with its result paths and the book `completed`.
pub fn complete(
    db: &Database,
    job_id: i64,
    book_id: i64,
    source_pdf: Option<&str>,
    russian_pdf: Option<&str>,
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        let tx = conn.unchecked_transaction()?;
        tx.execute(
            "UPDATE jobs SET status = ?2, completed_at = ?3, error_message = NULL,
             result_source_path = ?4, result_russian_path = ?5
             WHERE id = ?1",
            params![job_id, JobStatus::Completed, now(), source_pdf, russian_pdf],
        )?;
        tx.execute(
            "UPDATE books SET status = ?2 WHERE id = ?1",
            params![book_id, BookStatus::Completed],
        )?;
        tx.commit()?;
        Ok(())
    })
}

/// Marks the job `failed` with `message` and the book `error`.
pub fn fail(db: &Database, job_id: i64, book_id: i64, message: &str) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        let tx = conn.unchecked_transaction()?;
        tx.execute(
            "UPDATE jobs SET status = ?2, completed_at = ?3, error_message = ?4 WHERE id = ?1",
            params![job_id, JobStatus::Failed, now(), message],
        )?;
        tx.execute(
            "UPDATE books SET status = ?2 WHERE id = ?1",
            params![book_id, BookStatus::Error],
        )?;
        tx.commit()?;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::book_repo;

    fn test_db() -> Database {
        Database::open_in_memory().expect("Failed to create test database")
    }

    #[test]
    fn test_insert_is_queued() {
        let db = test_db();
        let book = book_repo::insert(&db, "Book", "").unwrap();
        let job = insert(&db, book).unwrap();

        let row = find_by_id(&db, job).unwrap().unwrap();
        assert_eq!(row.book_id, book);
        assert_eq!(row.status, JobStatus::Queued);
        assert!(row.completed_at.is_none());
        assert!(row.started_at.is_none());
    }

    #[test]
    fn test_start_unknown_job() {
        let db = test_db();
        let book = book_repo::insert(&db, "Book", "").unwrap();

        let result = start(&db, 42, book);
        assert!(matches!(
            result,
            Err(DatabaseError::MissingRow { table: "jobs", id: 42 })
        ));
        let book_row = book_repo::find_by_id(&db, book).unwrap().unwrap();
        assert_eq!(book_row.status, BookStatus::New);
    }

    #[test]
    fn test_find_nonexistent() {
        let db = test_db();
        assert!(find_by_id(&db, 7).unwrap().is_none());
    }

    #[test]
    fn test_latest_for_book() {
        let db = test_db();
        let book = book_repo::insert(&db, "Book", "").unwrap();
        assert!(latest_for_book(&db, book).unwrap().is_none());

        insert(&db, book).unwrap();
        let second = insert(&db, book).unwrap();
        assert_eq!(latest_for_book(&db, book).unwrap().unwrap().id, second);
    }

    #[test]
    fn test_start_then_complete() {
        let db = test_db();
        let book = book_repo::insert(&db, "Book", "").unwrap();
        let job = insert(&db, book).unwrap();

        start(&db, job, book).unwrap();
        let row = find_by_id(&db, job).unwrap().unwrap();
        assert_eq!(row.status, JobStatus::Processing);
        assert!(row.started_at.is_some());
        assert!(row.completed_at.is_none());
        assert_eq!(
            book_repo::find_by_id(&db, book).unwrap().unwrap().status,
            BookStatus::Processing
        );

        complete(&db, job, book, Some("/pdf/Book_en.pdf"), None).unwrap();
        let row = find_by_id(&db, job).unwrap().unwrap();
        assert_eq!(row.status, JobStatus::Completed);
        assert!(row.completed_at.is_some());
        assert_eq!(row.result_source_path.as_deref(), Some("/pdf/Book_en.pdf"));
        assert!(row.result_russian_path.is_none());
        assert_eq!(
            book_repo::find_by_id(&db, book).unwrap().unwrap().status,
            BookStatus::Completed
        );
    }

    #[test]
    fn test_fail_records_message() {
        let db = test_db();
        let book = book_repo::insert(&db, "Book", "").unwrap();
        let job = insert(&db, book).unwrap();
        start(&db, job, book).unwrap();

        fail(&db, job, book, "No pages found for book").unwrap();
        let row = find_by_id(&db, job).unwrap().unwrap();
        assert_eq!(row.status, JobStatus::Failed);
        assert!(row.completed_at.is_some());
        assert_eq!(row.error_message.as_deref(), Some("No pages found for book"));
        assert_eq!(
            book_repo::find_by_id(&db, book).unwrap().unwrap().status,
            BookStatus::Error
        );
    }

    #[test]
    fn test_restart_clears_terminal_fields() {
        let db = test_db();
        let book = book_repo::insert(&db, "Book", "").unwrap();
        let job = insert(&db, book).unwrap();
        start(&db, job, book).unwrap();
        fail(&db, job, book, "boom").unwrap();

        start(&db, job, book).unwrap();
        let row = find_by_id(&db, job).unwrap().unwrap();
        assert_eq!(row.status, JobStatus::Processing);
        assert!(row.completed_at.is_none());
        assert!(row.error_message.is_none());
    }
}
