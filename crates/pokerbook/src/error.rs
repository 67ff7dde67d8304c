use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PokerbookError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Processing error: {0}")]
    Process(#[from] ProcessError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("Secret error: {0}")]
    Secret(#[from] crate::secrets::SecretError),

    #[error("Translation error: {0}")]
    Translation(#[from] crate::translation::TranslationError),

    #[error("Render error: {0}")]
    Render(#[from] crate::render::RenderError),

    #[error("Book run failed: {0}")]
    Coordinator(#[from] crate::coordinator::CoordinatorError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },
}

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Failed to read source '{path}': {source}")]
    ReadSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Source file not found: {0}")]
    MissingSource(PathBuf),

    #[error("Failed to process image: {0}")]
    ImageProcessing(String),

    #[error("Preprocessing failed: {0}")]
    Preprocessing(String),

    #[error("OCR failed: {0}")]
    OcrFailed(String),

    #[error("Failed to process PDF: {0}")]
    PdfProcessing(String),

    #[error("Figure detection failed: {0}")]
    FigureDetection(String),

    #[error("No images or PDF files found in {0}")]
    NothingToImport(PathBuf),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize '{path}': {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode image '{path}': {reason}")]
    EncodeImage { path: PathBuf, reason: String },
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Failed to spawn worker: {0}")]
    SpawnFailed(String),

    #[error("Worker channel closed unexpectedly")]
    ChannelClosed,
}

pub type Result<T> = std::result::Result<T, PokerbookError>;
