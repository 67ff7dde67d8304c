use std::path::PathBuf;
use std::sync::Mutex;

use crate::assembler::Language;
use crate::db::PageStatus;

/// The stages of one page, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Preprocess,
    ExtractText,
    EnhanceText,
    DetectFigures,
    Translate,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Preprocess => "preprocess",
            Self::ExtractText => "extract_text",
            Self::EnhanceText => "enhance_text",
            Self::DetectFigures => "detect_figures",
            Self::Translate => "translate",
        }
    }
}

/// Events emitted while a book is processed.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    PageStarted {
        page_number: u32,
    },
    Stage {
        page_number: u32,
        stage: Stage,
        fallback: bool,
    },
    PageFinished {
        page_number: u32,
        status: PageStatus,
    },
    PdfGenerated {
        language: Language,
        path: Option<PathBuf>,
    },
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// No-op reporter for unit tests.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Forwards events to the tracing subscriber.
pub struct LogProgress;

impl ProgressReporter for LogProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::PageStarted { page_number } => {
                tracing::info!(page_number, "Page started");
            }
            ProgressEvent::Stage {
                page_number,
                stage,
                fallback,
            } => {
                tracing::debug!(page_number, stage = stage.as_str(), fallback, "Stage finished");
            }
            ProgressEvent::PageFinished {
                page_number,
                status,
            } => {
                tracing::info!(page_number, status = status.as_str(), "Page finished");
            }
            ProgressEvent::PdfGenerated { language, path } => match path {
                Some(path) => tracing::info!(
                    language = language.tag(),
                    file = %crate::sanitize::redact_path(&path),
                    "PDF ready"
                ),
                None => tracing::warn!(language = language.tag(), "No PDF produced"),
            },
        }
    }
}

/// Keeps every event, for tests and callers that inspect a run afterwards.
#[derive(Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl ProgressReporter for RecordingProgress {
    fn report(&self, event: ProgressEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
