//! PDF rendering of assembled content trees.

pub mod font;
pub mod lopdf_renderer;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::assembler::{ContentTree, Language};
use crate::sanitize;

pub use font::FontData;
pub use lopdf_renderer::LopdfRenderer;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to load font '{name}': {reason}")]
    Font { name: String, reason: String },

    #[error("Failed to embed image '{path}': {reason}")]
    Image { path: PathBuf, reason: String },

    #[error("Failed to serialize PDF: {0}")]
    Serialize(String),

    #[error("Failed to write PDF '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub trait PdfRenderer: Send + Sync {
    /// Renders `tree` to `{output_dir}/{title stem}_{language}.pdf`,
    /// replacing any earlier file, and returns the written path. `title` is
    /// the book's own title and names the file; the heading comes from the
    /// tree.
    fn render_pdf(
        &self,
        tree: &ContentTree,
        language: Language,
        title: &str,
        output_dir: &Path,
    ) -> Result<PathBuf, RenderError>;
}

/// File name of the PDF generated for a book title and language.
pub fn output_file_name(title: &str, language: Language) -> String {
    format!("{}_{}.pdf", sanitize::file_stem(title), language.tag())
}
