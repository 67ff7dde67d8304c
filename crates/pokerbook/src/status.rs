//! Status reports and result-file lookup for polling clients.

use std::path::PathBuf;

use serde::Serialize;

use crate::assembler::Language;
use crate::coordinator::CoordinatorError;
use crate::db::job_repo::JobRow;
use crate::db::{book_repo, figure_repo, job_repo, page_repo, BookStatus, Database, JobStatus, PageStatus};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageStatusEntry {
    pub number: u32,
    pub status: PageStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultPaths {
    pub en: Option<String>,
    pub ru: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobStatusEntry {
    pub id: i64,
    pub status: JobStatus,
    pub created_at: String,
    pub completed_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_paths: Option<ResultPaths>,
}

impl From<JobRow> for JobStatusEntry {
    fn from(job: JobRow) -> Self {
        let result_paths = if job.result_source_path.is_some() || job.result_russian_path.is_some() {
            Some(ResultPaths {
                en: job.result_source_path,
                ru: job.result_russian_path,
            })
        } else {
            None
        };

        Self {
            id: job.id,
            status: job.status,
            created_at: job.created_at,
            completed_at: job.completed_at,
            error_message: job.error_message,
            result_paths,
        }
    }
}

/// Aggregate state of a book and its latest job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookStatusReport {
    pub book_id: i64,
    pub title: String,
    pub status: BookStatus,
    pub pages: Vec<PageStatusEntry>,
    pub figure_count: u64,
    pub job: Option<JobStatusEntry>,
}

pub fn book_status(db: &Database, book_id: i64) -> Result<BookStatusReport> {
    let book = book_repo::find_by_id(db, book_id)?.ok_or(CoordinatorError::BookNotFound(book_id))?;

    let pages = page_repo::list_for_book(db, book_id)?
        .into_iter()
        .map(|page| PageStatusEntry {
            number: page.page_number,
            status: page.status,
            error_message: page.error_message,
        })
        .collect();

    Ok(BookStatusReport {
        book_id,
        title: book.title,
        status: book.status,
        pages,
        figure_count: figure_repo::count_for_book(db, book_id)?,
        job: job_repo::latest_for_book(db, book_id)?.map(JobStatusEntry::from),
    })
}

/// The PDF of a job for one language, when the job recorded one and the
/// file is still on disk.
pub fn result_file(db: &Database, job_id: i64, language: Language) -> Result<Option<PathBuf>> {
    let Some(job) = job_repo::find_by_id(db, job_id)? else {
        return Ok(None);
    };

    let recorded = match language {
        Language::Source => job.result_source_path,
        Language::Russian => job.result_russian_path,
    };

    Ok(recorded.map(PathBuf::from).filter(|path| path.is_file()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::books;
    use tempfile::TempDir;

    #[test]
    fn test_status_of_new_book() {
        let db = Database::open_in_memory().unwrap();
        let book_id = books::create_book_from_images(
            &db,
            "Book",
            "",
            &[PathBuf::from("/in/1.png"), PathBuf::from("/in/2.png")],
        )
        .unwrap();

        let report = book_status(&db, book_id).unwrap();
        assert_eq!(report.status, BookStatus::New);
        assert_eq!(report.pages.len(), 2);
        assert_eq!(report.pages[1].number, 2);
        assert!(report.job.is_none());

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "new");
        assert_eq!(json["pages"][0]["status"], "pending");
        assert!(json["pages"][0].get("error_message").is_none());
    }

    #[test]
    fn test_status_reports_latest_job() {
        let db = Database::open_in_memory().unwrap();
        let book_id =
            books::create_book_from_images(&db, "Book", "", &[PathBuf::from("/in/1.png")]).unwrap();
        books::enqueue_processing(&db, book_id).unwrap();
        let job_id = books::enqueue_processing(&db, book_id).unwrap();
        job_repo::fail(&db, job_id, book_id, "No pages found").unwrap();

        let report = book_status(&db, book_id).unwrap();
        assert_eq!(report.status, BookStatus::Error);
        let job = report.job.unwrap();
        assert_eq!(job.id, job_id);
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error_message.as_deref(), Some("No pages found"));
        assert!(job.result_paths.is_none());
    }

    #[test]
    fn test_status_unknown_book() {
        let db = Database::open_in_memory().unwrap();
        assert!(book_status(&db, 5).is_err());
    }

    #[test]
    fn test_result_file_requires_existing_file() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("Book_en.pdf");
        std::fs::write(&source, b"%PDF-1.5").unwrap();
        let missing = temp.path().join("Book_ru.pdf");

        let db = Database::open_in_memory().unwrap();
        let book_id =
            books::create_book_from_images(&db, "Book", "", &[PathBuf::from("/in/1.png")]).unwrap();
        let job_id = books::enqueue_processing(&db, book_id).unwrap();
        job_repo::start(&db, job_id, book_id).unwrap();
        job_repo::complete(
            &db,
            job_id,
            book_id,
            Some(&source.to_string_lossy()),
            Some(&missing.to_string_lossy()),
        )
        .unwrap();

        assert_eq!(result_file(&db, job_id, Language::Source).unwrap(), Some(source));
        assert_eq!(result_file(&db, job_id, Language::Russian).unwrap(), None);
        assert_eq!(result_file(&db, job_id + 1, Language::Source).unwrap(), None);
    }
}
