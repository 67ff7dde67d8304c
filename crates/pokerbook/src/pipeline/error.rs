use thiserror::Error;

/// A page-fatal failure. Its message is stored as the page's error.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{0}")]
    Processing(#[from] crate::error::ProcessError),

    #[error("{0}")]
    Storage(#[from] crate::error::StorageError),
}

/// A contained failure: the stage fell back and the page carried on.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineWarning {
    TextExtractionFailed { reason: String },
    EnhancementFailed { reason: String },
    FigureDetectionFailed { reason: String },
    FigureNotSaved { index: usize },
    TranslationFailed { reason: String },
    ArtifactNotWritten { artifact: &'static str, reason: String },
}

impl std::fmt::Display for PipelineWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TextExtractionFailed { reason } => write!(f, "text extraction failed: {}", reason),
            Self::EnhancementFailed { reason } => write!(f, "OCR correction failed: {}", reason),
            Self::FigureDetectionFailed { reason } => {
                write!(f, "figure detection failed: {}", reason)
            }
            Self::FigureNotSaved { index } => write!(f, "figure {} could not be saved", index),
            Self::TranslationFailed { reason } => write!(f, "translation failed: {}", reason),
            Self::ArtifactNotWritten { artifact, reason } => {
                write!(f, "{} not written: {}", artifact, reason)
            }
        }
    }
}
