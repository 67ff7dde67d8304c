//! Per-book output directory layout and artifact writers.

use std::path::{Path, PathBuf};

use chrono::Local;
use serde::Serialize;

use crate::db::{FigureType, PageSource};
use crate::error::StorageError;

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// `book_{id}/` under the output root and its fixed subdirectories.
#[derive(Debug, Clone)]
pub struct BookLayout {
    root: PathBuf,
}

impl BookLayout {
    pub fn new<P: AsRef<Path>>(output_root: P, book_id: i64) -> Self {
        Self {
            root: output_root.as_ref().join(format!("book_{}", book_id)),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn text_dir(&self) -> PathBuf {
        self.root.join("text")
    }

    pub fn images_dir(&self) -> PathBuf {
        self.root.join("images")
    }

    pub fn tables_dir(&self) -> PathBuf {
        self.root.join("tables")
    }

    pub fn diagrams_dir(&self) -> PathBuf {
        self.root.join("diagrams")
    }

    pub fn translated_dir(&self) -> PathBuf {
        self.root.join("translated")
    }

    pub fn pdf_dir(&self) -> PathBuf {
        self.root.join("pdf")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.root.join("cache")
    }

    /// Creates every subdirectory. Safe to call repeatedly and from
    /// concurrent runs.
    pub fn ensure(&self) -> Result<(), StorageError> {
        for dir in [
            self.text_dir(),
            self.images_dir(),
            self.tables_dir(),
            self.diagrams_dir(),
            self.translated_dir(),
            self.pdf_dir(),
            self.cache_dir(),
        ] {
            ensure_directory(&dir)?;
        }
        Ok(())
    }

    /// Charts and diagrams go to `diagrams/`, everything else to `tables/`.
    pub fn figure_dir(&self, figure_type: FigureType) -> PathBuf {
        if figure_type.is_diagram() {
            self.diagrams_dir()
        } else {
            self.tables_dir()
        }
    }

    pub fn preprocessed_image(&self, basename: &str) -> PathBuf {
        self.images_dir().join(format!("{}_preprocessed.png", basename))
    }

    pub fn raw_text(&self, basename: &str) -> PathBuf {
        self.text_dir().join(format!("{}_raw.txt", basename))
    }

    pub fn corrected_text(&self, basename: &str) -> PathBuf {
        self.text_dir().join(format!("{}_corrected.txt", basename))
    }

    pub fn structure_json(&self, basename: &str) -> PathBuf {
        self.text_dir().join(format!("{}_structure.json", basename))
    }

    pub fn translated_json(&self, basename: &str) -> PathBuf {
        self.translated_dir()
            .join(format!("{}_translated.json", basename))
    }

    pub fn book_structure(&self, book_stem: &str) -> PathBuf {
        self.text_dir().join(format!("{}_structure.json", book_stem))
    }

    pub fn translation_cache(&self) -> PathBuf {
        self.cache_dir().join("translation_cache.json")
    }
}

/// Current local time in the artifact timestamp format.
pub fn artifact_timestamp() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// `{stem}_page_{NNN}_{timestamp}`. The page number keeps sources that share
/// a file stem apart within one run.
pub fn artifact_basename(source: &PageSource, page_number: u32, timestamp: &str) -> String {
    let stem = source
        .path()
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "page".to_string());
    format!("{}_page_{:03}_{}", stem, page_number, timestamp)
}

pub fn ensure_directory(path: &Path) -> Result<(), StorageError> {
    std::fs::create_dir_all(path).map_err(|e| StorageError::CreateDirectory {
        path: path.to_path_buf(),
        source: e,
    })
}

pub fn write_text(path: &Path, content: &str) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        ensure_directory(parent)?;
    }
    std::fs::write(path, content).map_err(|e| StorageError::WriteFile {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Writes `value` as pretty-printed UTF-8 JSON.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| StorageError::Serialize {
        path: path.to_path_buf(),
        source: e,
    })?;
    write_text(path, &json)
}
