//! Book-level operations: creating books from uploads and queueing runs.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::coordinator::CoordinatorError;
use crate::db::{book_repo, job_repo, page_repo, Database, PageSource};
use crate::error::{ProcessError, Result};
use crate::processor::sort_by_page_number;
use crate::sanitize;

/// Creates a book with one page per image, numbered 1..N in the given order.
pub fn create_book_from_images(
    db: &Database,
    title: &str,
    description: &str,
    images: &[PathBuf],
) -> Result<i64> {
    let book_id = book_repo::insert(db, title, description)?;
    for (i, image) in images.iter().enumerate() {
        page_repo::insert(db, book_id, i as u32 + 1, &PageSource::Image(image.clone()))?;
    }

    info!(book_id, pages = images.len(), "Created image book");
    Ok(book_id)
}

/// Creates a book holding one whole-PDF page record. The PDF is split into
/// pages when the book is first processed.
pub fn create_book_from_pdf(
    db: &Database,
    title: &str,
    description: &str,
    pdf: &Path,
) -> Result<i64> {
    let book_id = book_repo::insert(db, title, description)?;
    page_repo::insert(db, book_id, 1, &PageSource::Pdf(pdf.to_path_buf()))?;

    info!(book_id, file = %sanitize::redact_path(pdf), "Created PDF book");
    Ok(book_id)
}

/// Creates a book from the top level of `dir`. Images make an image-set
/// book ordered by the page numbers in their file names; without images,
/// the first PDF makes a PDF book.
pub fn import_directory(db: &Database, title: &str, dir: &Path) -> Result<i64> {
    let mut images = Vec::new();
    let mut pdfs = Vec::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !entry.file_type().is_file() {
            continue;
        }

        let Some(mime) = mime_guess::from_path(path).first() else {
            continue;
        };
        if mime.type_() == mime_guess::mime::IMAGE {
            debug!(file = %sanitize::redact_path(path), "Found image");
            images.push(path.to_path_buf());
        } else if mime.essence_str() == "application/pdf" {
            debug!(file = %sanitize::redact_path(path), "Found PDF");
            pdfs.push(path.to_path_buf());
        }
    }

    let description = format!("Imported from {}", dir.display());

    if !images.is_empty() {
        if !pdfs.is_empty() {
            warn!(pdfs = pdfs.len(), "Ignoring PDF files next to page images");
        }
        sort_by_page_number(&mut images);
        return create_book_from_images(db, title, &description, &images);
    }

    pdfs.sort();
    match pdfs.split_first() {
        Some((pdf, rest)) => {
            if !rest.is_empty() {
                warn!(ignored = rest.len(), "Importing only the first PDF");
            }
            create_book_from_pdf(db, title, &description, pdf)
        }
        None => Err(ProcessError::NothingToImport(dir.to_path_buf()).into()),
    }
}

/// Creates a `queued` job for the book and returns its id.
pub fn enqueue_processing(db: &Database, book_id: i64) -> Result<i64> {
    if book_repo::find_by_id(db, book_id)?.is_none() {
        return Err(CoordinatorError::BookNotFound(book_id).into());
    }

    let job_id = job_repo::insert(db, book_id)?;
    info!(book_id, job_id, "Queued book");
    Ok(job_id)
}

/// Resets every page and deletes the book's figures, then queues a fresh
/// job. Earlier artifacts are overwritten by the new run.
pub fn prepare_reprocess(db: &Database, book_id: i64) -> Result<i64> {
    if book_repo::find_by_id(db, book_id)?.is_none() {
        return Err(CoordinatorError::BookNotFound(book_id).into());
    }

    let reset = page_repo::reset_for_reprocess(db, book_id)?;
    debug!(book_id, pages = reset, "Pages reset");
    enqueue_processing(db, book_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{figure_repo, BookStatus, FigureType, JobStatus, PageStatus, Region};
    use crate::db::page_repo::{NewFigure, PageUpdate};
    use crate::error::PokerbookError;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, b"x").unwrap();
        path
    }

    #[test]
    fn test_create_book_from_images_numbers_pages() {
        let db = Database::open_in_memory().unwrap();
        let images = vec![PathBuf::from("/in/b.png"), PathBuf::from("/in/a.png")];

        let book_id = create_book_from_images(&db, "Book", "", &images).unwrap();
        let pages = page_repo::list_for_book(&db, book_id).unwrap();

        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].page_number, 1);
        assert_eq!(pages[0].source, PageSource::Image(PathBuf::from("/in/b.png")));
        assert_eq!(pages[1].page_number, 2);
        assert_eq!(pages[1].status, PageStatus::Pending);
    }

    #[test]
    fn test_create_book_from_pdf_single_record() {
        let db = Database::open_in_memory().unwrap();
        let book_id = create_book_from_pdf(&db, "Book", "", Path::new("/in/book.pdf")).unwrap();

        let pages = page_repo::list_for_book(&db, book_id).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].source, PageSource::Pdf(PathBuf::from("/in/book.pdf")));
        let book = book_repo::find_by_id(&db, book_id).unwrap().unwrap();
        assert_eq!(book.status, BookStatus::New);
    }

    #[test]
    fn test_import_directory_sorts_images() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "page_10.png");
        touch(temp.path(), "page_2.jpg");
        touch(temp.path(), "notes.txt");
        touch(temp.path(), "page_1.png");
        std::fs::create_dir(temp.path().join("page_3.png")).unwrap();

        let db = Database::open_in_memory().unwrap();
        let book_id = import_directory(&db, "Book", temp.path()).unwrap();
        let names: Vec<String> = page_repo::list_for_book(&db, book_id)
            .unwrap()
            .iter()
            .map(|p| sanitize::redact_path(p.source.path()))
            .collect();

        assert_eq!(names, vec!["page_1.png", "page_2.jpg", "page_10.png"]);
    }

    #[test]
    fn test_import_directory_pdf() {
        let temp = TempDir::new().unwrap();
        let pdf = touch(temp.path(), "book.pdf");

        let db = Database::open_in_memory().unwrap();
        let book_id = import_directory(&db, "Book", temp.path()).unwrap();
        let pages = page_repo::list_for_book(&db, book_id).unwrap();
        assert_eq!(pages[0].source, PageSource::Pdf(pdf));
    }

    #[test]
    fn test_import_empty_directory() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "readme.md");

        let db = Database::open_in_memory().unwrap();
        let err = import_directory(&db, "Book", temp.path()).unwrap_err();
        assert!(matches!(
            err,
            PokerbookError::Process(ProcessError::NothingToImport(_))
        ));
        assert!(book_repo::list(&db).unwrap().is_empty());
    }

    #[test]
    fn test_enqueue_unknown_book() {
        let db = Database::open_in_memory().unwrap();
        let err = enqueue_processing(&db, 42).unwrap_err();
        assert!(matches!(
            err,
            PokerbookError::Coordinator(CoordinatorError::BookNotFound(42))
        ));
    }

    #[test]
    fn test_prepare_reprocess_resets_pages_and_figures() {
        let db = Database::open_in_memory().unwrap();
        let book_id =
            create_book_from_images(&db, "Book", "", &[PathBuf::from("/in/1.png")]).unwrap();
        let page = &page_repo::list_for_book(&db, book_id).unwrap()[0];

        let update = PageUpdate {
            status: PageStatus::Processed,
            processed_image: Some("/out/1.png".to_string()),
            original_text: Some("Text".to_string()),
            enhanced_text: Some("Text".to_string()),
            translated_content: Some("Текст".to_string()),
            structure_path: None,
            error_message: None,
        };
        let figure = NewFigure {
            figure_type: FigureType::Table,
            region: Region::new(0, 0, 10, 10),
            image_path: "/out/t.png".to_string(),
            description: "Odds".to_string(),
            translated_description: None,
        };
        page_repo::record_outcome(&db, page.id, &update, &[figure]).unwrap();
        let first_job = enqueue_processing(&db, book_id).unwrap();

        let job_id = prepare_reprocess(&db, book_id).unwrap();

        assert_ne!(job_id, first_job);
        let page = page_repo::find_by_id(&db, page.id).unwrap().unwrap();
        assert_eq!(page.status, PageStatus::Pending);
        assert!(page.original_text.is_none());
        assert_eq!(figure_repo::count_for_book(&db, book_id).unwrap(), 0);
        let job = job_repo::find_by_id(&db, job_id).unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Queued);
    }
}
