//! Page repository: rows of the `pages` table and the single-transaction
//! write of a page's processing outcome.

use std::path::Path;

use rusqlite::{params, OptionalExtension, Row};

use super::models::{FigureType, PageSource, PageStatus, Region};
use super::{now, Database, DatabaseError};

#[derive(Debug, Clone)]
pub struct PageRow {
    pub id: i64,
    pub book_id: i64,
    pub page_number: u32,
    pub source: PageSource,
    pub processed_image: Option<String>,
    pub original_text: Option<String>,
    pub enhanced_text: Option<String>,
    pub translated_content: Option<String>,
    pub structure_path: Option<String>,
    pub status: PageStatus,
    pub error_message: Option<String>,
    pub updated_at: String,
}

impl PageRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let source_ref: String = row.get("source_ref")?;
        Ok(Self {
            id: row.get("id")?,
            book_id: row.get("book_id")?,
            page_number: row.get("page_number")?,
            source: PageSource::parse(&source_ref),
            processed_image: row.get("processed_image")?,
            original_text: row.get("original_text")?,
            enhanced_text: row.get("enhanced_text")?,
            translated_content: row.get("translated_content")?,
            structure_path: row.get("structure_path")?,
            status: row.get("status")?,
            error_message: row.get("error_message")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Every content field written at the end of a page attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct PageUpdate {
    pub status: PageStatus,
    pub processed_image: Option<String>,
    pub original_text: Option<String>,
    pub enhanced_text: Option<String>,
    pub translated_content: Option<String>,
    pub structure_path: Option<String>,
    pub error_message: Option<String>,
}

impl PageUpdate {
    /// An outcome that carries only an error.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: PageStatus::Error,
            processed_image: None,
            original_text: None,
            enhanced_text: None,
            translated_content: None,
            structure_path: None,
            error_message: Some(message.into()),
        }
    }
}

/// A figure to be stored with a page outcome. The image path is mandatory.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFigure {
    pub figure_type: FigureType,
    pub region: Region,
    pub image_path: String,
    pub description: String,
    pub translated_description: Option<String>,
}

pub fn insert(
    db: &Database,
    book_id: i64,
    page_number: u32,
    source: &PageSource,
) -> Result<i64, DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO pages (book_id, page_number, source_ref, status, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![book_id, page_number, source.to_ref(), PageStatus::Pending, now()],
        )?;
        Ok(conn.last_insert_rowid())
    })
}

/// Pages of a book in page-number order.
pub fn list_for_book(db: &Database, book_id: i64) -> Result<Vec<PageRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt =
            conn.prepare("SELECT * FROM pages WHERE book_id = ?1 ORDER BY page_number ASC")?;
        let rows = stmt
            .query_map(params![book_id], PageRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

pub fn find_by_id(db: &Database, id: i64) -> Result<Option<PageRow>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row(
                "SELECT * FROM pages WHERE id = ?1",
                params![id],
                PageRow::from_row,
            )
            .optional()?;
        Ok(row)
    })
}

/// Moves the page to `processing` and clears any earlier error.
pub fn mark_processing(db: &Database, page_id: i64) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE pages SET status = ?2, error_message = NULL, updated_at = ?3 WHERE id = ?1",
            params![page_id, PageStatus::Processing, now()],
        )?;
        Ok(())
    })
}

/// Writes all content fields and the final status of one page and
/// replaces its figures, in one transaction.
pub fn record_outcome(
    db: &Database,
    page_id: i64,
    update: &PageUpdate,
    figures: &[NewFigure],
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        let tx = conn.unchecked_transaction()?;
        tx.execute(
            "UPDATE pages SET status = ?2, processed_image = ?3, original_text = ?4,
             enhanced_text = ?5, translated_content = ?6, structure_path = ?7,
             error_message = ?8, updated_at = ?9
             WHERE id = ?1",
            params![
                page_id,
                update.status,
                update.processed_image,
                update.original_text,
                update.enhanced_text,
                update.translated_content,
                update.structure_path,
                update.error_message,
                now(),
            ],
        )?;
        tx.execute("DELETE FROM figures WHERE page_id = ?1", params![page_id])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO figures (page_id, position, figure_type, region_x, region_y,
                 region_width, region_height, image_path, description, translated_description)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;
            for (position, figure) in figures.iter().enumerate() {
                stmt.execute(params![
                    page_id,
                    position as i64,
                    figure.figure_type,
                    figure.region.x,
                    figure.region.y,
                    figure.region.width,
                    figure.region.height,
                    figure.image_path,
                    figure.description,
                    figure.translated_description,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    })
}

/// Replaces the whole-PDF page record(s) of a book with one record per PDF
/// page, numbered 1..=`page_count`. Returns the new page ids in order.
pub fn replace_with_pdf_pages(
    db: &Database,
    book_id: i64,
    pdf_path: &Path,
    page_count: u32,
) -> Result<Vec<i64>, DatabaseError> {
    db.with_conn(|conn| {
        let tx = conn.unchecked_transaction()?;
        tx.execute("DELETE FROM pages WHERE book_id = ?1", params![book_id])?;

        let timestamp = now();
        let mut ids = Vec::with_capacity(page_count as usize);
        {
            let mut stmt = tx.prepare(
                "INSERT INTO pages (book_id, page_number, source_ref, status, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for page in 1..=page_count {
                let source = PageSource::PdfPage {
                    path: pdf_path.to_path_buf(),
                    page,
                };
                stmt.execute(params![
                    book_id,
                    page,
                    source.to_ref(),
                    PageStatus::Pending,
                    timestamp
                ])?;
                ids.push(tx.last_insert_rowid());
            }
        }
        tx.commit()?;

        log::info!("Book {} split into {} PDF pages", book_id, page_count);
        Ok(ids)
    })
}

/// Puts every page of a book back to `pending`, clears derived content and
/// deletes its figures.
pub fn reset_for_reprocess(db: &Database, book_id: i64) -> Result<usize, DatabaseError> {
    db.with_conn(|conn| {
        let tx = conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM figures WHERE page_id IN (SELECT id FROM pages WHERE book_id = ?1)",
            params![book_id],
        )?;
        let reset = tx.execute(
            "UPDATE pages SET status = ?2, processed_image = NULL, original_text = NULL,
             enhanced_text = NULL, translated_content = NULL, structure_path = NULL,
             error_message = NULL, updated_at = ?3
             WHERE book_id = ?1",
            params![book_id, PageStatus::Pending, now()],
        )?;
        tx.commit()?;
        Ok(reset)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{book_repo, figure_repo};
    use std::path::PathBuf;

    fn test_db() -> Database {
        Database::open_in_memory().expect("Failed to create test database")
    }

    fn image(name: &str) -> PageSource {
        PageSource::Image(PathBuf::from(format!("/uploads/{}", name)))
    }

    fn processed_update() -> PageUpdate {
        PageUpdate {
            status: PageStatus::Processed,
            processed_image: Some("/out/images/p_preprocessed.png".to_string()),
            original_text: Some("Raise preflop.".to_string()),
            enhanced_text: Some("Raise pre-flop.".to_string()),
            translated_content: Some("Повышайте префлоп.".to_string()),
            structure_path: Some("/out/text/p_structure.json".to_string()),
            error_message: None,
        }
    }

    fn figure(figure_type: FigureType, path: &str) -> NewFigure {
        NewFigure {
            figure_type,
            region: Region::new(10, 20, 300, 200),
            image_path: path.to_string(),
            description: "Equity chart".to_string(),
            translated_description: Some("График эквити".to_string()),
        }
    }

    #[test]
    fn test_insert_and_list_in_page_order() {
        let db = test_db();
        let book = book_repo::insert(&db, "Book", "").unwrap();
        insert(&db, book, 2, &image("b.png")).unwrap();
        insert(&db, book, 1, &image("a.png")).unwrap();

        let pages = list_for_book(&db, book).unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].page_number, 1);
        assert_eq!(pages[0].source, image("a.png"));
        assert_eq!(pages[0].status, PageStatus::Pending);
        assert_eq!(pages[1].page_number, 2);
    }

    #[test]
    fn test_duplicate_page_number_rejected() {
        let db = test_db();
        let book = book_repo::insert(&db, "Book", "").unwrap();
        insert(&db, book, 1, &image("a.png")).unwrap();
        assert!(insert(&db, book, 1, &image("b.png")).is_err());
    }

    #[test]
    fn test_mark_processing() {
        let db = test_db();
        let book = book_repo::insert(&db, "Book", "").unwrap();
        let page = insert(&db, book, 1, &image("a.png")).unwrap();

        mark_processing(&db, page).unwrap();
        assert_eq!(
            find_by_id(&db, page).unwrap().unwrap().status,
            PageStatus::Processing
        );
    }

    #[test]
    fn test_record_outcome_writes_fields_and_figures() {
        let db = test_db();
        let book = book_repo::insert(&db, "Book", "").unwrap();
        let page = insert(&db, book, 1, &image("a.png")).unwrap();

        let figures = vec![
            figure(FigureType::Table, "/out/tables/t0.png"),
            figure(FigureType::Chart, "/out/diagrams/c1.png"),
        ];
        record_outcome(&db, page, &processed_update(), &figures).unwrap();

        let row = find_by_id(&db, page).unwrap().unwrap();
        assert_eq!(row.status, PageStatus::Processed);
        assert_eq!(row.original_text.as_deref(), Some("Raise preflop."));
        assert_eq!(row.enhanced_text.as_deref(), Some("Raise pre-flop."));
        assert_eq!(row.translated_content.as_deref(), Some("Повышайте префлоп."));

        let stored = figure_repo::list_for_page(&db, page).unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].figure_type, FigureType::Table);
        assert_eq!(stored[1].figure_type, FigureType::Chart);
        assert_eq!(stored[1].region, Region::new(10, 20, 300, 200));
    }

    #[test]
    fn test_record_outcome_replaces_figures() {
        let db = test_db();
        let book = book_repo::insert(&db, "Book", "").unwrap();
        let page = insert(&db, book, 1, &image("a.png")).unwrap();

        let two = vec![
            figure(FigureType::Table, "/t0.png"),
            figure(FigureType::Table, "/t1.png"),
        ];
        record_outcome(&db, page, &processed_update(), &two).unwrap();
        record_outcome(&db, page, &processed_update(), &two[..1]).unwrap();

        assert_eq!(figure_repo::list_for_page(&db, page).unwrap().len(), 1);
    }

    #[test]
    fn test_replace_with_pdf_pages() {
        let db = test_db();
        let book = book_repo::insert(&db, "Book", "").unwrap();
        let pdf = PathBuf::from("/uploads/book.pdf");
        insert(&db, book, 1, &PageSource::Pdf(pdf.clone())).unwrap();

        let ids = replace_with_pdf_pages(&db, book, &pdf, 3).unwrap();
        assert_eq!(ids.len(), 3);

        let pages = list_for_book(&db, book).unwrap();
        assert_eq!(pages.len(), 3);
        for (i, page) in pages.iter().enumerate() {
            assert_eq!(page.page_number, i as u32 + 1);
            assert_eq!(
                page.source,
                PageSource::PdfPage {
                    path: pdf.clone(),
                    page: i as u32 + 1
                }
            );
        }
    }

    #[test]
    fn test_reset_for_reprocess() {
        let db = test_db();
        let book = book_repo::insert(&db, "Book", "").unwrap();
        let page = insert(&db, book, 1, &image("a.png")).unwrap();
        record_outcome(
            &db,
            page,
            &processed_update(),
            &[figure(FigureType::Diagram, "/d.png")],
        )
        .unwrap();

        assert_eq!(reset_for_reprocess(&db, book).unwrap(), 1);

        let row = find_by_id(&db, page).unwrap().unwrap();
        assert_eq!(row.status, PageStatus::Pending);
        assert!(row.original_text.is_none());
        assert!(row.translated_content.is_none());
        assert!(row.processed_image.is_none());
        assert_eq!(row.source, image("a.png"));
        assert_eq!(figure_repo::count_for_book(&db, book).unwrap(), 0);
    }
}
