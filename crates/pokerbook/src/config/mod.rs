pub mod loader;
pub mod processing;
pub mod schema;

pub use loader::{load_config, load_config_from_str};
pub use processing::ProcessingConfig;
pub use schema::{Config, OcrConfig, PdfConfig, PreprocessConfig, TranslationConfig};
