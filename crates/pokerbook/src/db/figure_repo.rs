//! Figure repository. Figures are written only through
//! [`page_repo::record_outcome`](super::page_repo::record_outcome).

use rusqlite::{params, Row};

use super::models::{FigureType, Region};
use super::{Database, DatabaseError};

#[derive(Debug, Clone, PartialEq)]
pub struct FigureRow {
    pub id: i64,
    pub page_id: i64,
    pub position: u32,
    pub figure_type: FigureType,
    pub region: Region,
    pub image_path: String,
    pub description: String,
    pub translated_description: Option<String>,
}

impl FigureRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            page_id: row.get("page_id")?,
            position: row.get("position")?,
            figure_type: row.get("figure_type")?,
            region: Region {
                x: row.get("region_x")?,
                y: row.get("region_y")?,
                width: row.get("region_width")?,
                height: row.get("region_height")?,
            },
            image_path: row.get("image_path")?,
            description: row.get("description")?,
            translated_description: row.get("translated_description")?,
        })
    }
}

/// Figures of a page in detection order.
pub fn list_for_page(db: &Database, page_id: i64) -> Result<Vec<FigureRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt =
            conn.prepare("SELECT * FROM figures WHERE page_id = ?1 ORDER BY position ASC")?;
        let rows = stmt
            .query_map(params![page_id], FigureRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Figures of a whole book, in page order then detection order.
pub fn list_for_book(db: &Database, book_id: i64) -> Result<Vec<FigureRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT f.* FROM figures f JOIN pages p ON p.id = f.page_id
             WHERE p.book_id = ?1 ORDER BY p.page_number ASC, f.position ASC",
        )?;
        let rows = stmt
            .query_map(params![book_id], FigureRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

pub fn count_for_book(db: &Database, book_id: i64) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM figures f JOIN pages p ON p.id = f.page_id WHERE p.book_id = ?1",
            params![book_id],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}
