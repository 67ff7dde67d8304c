pub mod context;
pub mod document;
pub mod error;
pub mod page;
pub mod progress;
pub mod stage;

pub use context::{PageContext, PageInput, RunContext};
pub use document::{DocumentStructure, FigureRecord, TranslatedDocument, TRANSLATION_PLACEHOLDER};
pub use error::{PipelineError, PipelineWarning};
pub use page::{PageOutcome, PagePipeline};
pub use progress::{
    LogProgress, NoopProgress, ProgressEvent, ProgressReporter, RecordingProgress, Stage,
};
pub use stage::StageOutcome;
