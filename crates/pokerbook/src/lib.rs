pub mod assembler;
pub mod books;
pub mod config;
pub mod coordinator;
pub mod db;
pub mod error;
pub mod pipeline;
pub mod processor;
pub mod render;
pub mod sanitize;
pub mod secrets;
pub mod status;
pub mod storage;
pub mod translation;
pub mod worker;

pub use assembler::{ContentTree, Language, PdfAssembler};
pub use config::{load_config, Config, ProcessingConfig};
pub use coordinator::{BookCoordinator, CoordinatorError, RunSummary};
pub use db::Database;
pub use error::{ConfigError, PokerbookError, ProcessError, Result, StorageError, WorkerError};
pub use pipeline::{DocumentStructure, PagePipeline};
pub use processor::Capabilities;
pub use secrets::{resolve_secret, resolve_secret_optional, SecretError};
pub use status::{book_status, result_file, BookStatusReport};
pub use worker::{BookRun, BookWorkerPool, RunOutcome};
