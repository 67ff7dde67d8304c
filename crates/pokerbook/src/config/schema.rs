use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    #[serde(default = "default_database_path")]
    pub database_path: String,
    #[serde(default = "default_output_root")]
    pub output_root: String,
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub preprocess: PreprocessConfig,
    #[serde(default)]
    pub translation: TranslationConfig,
    #[serde(default)]
    pub pdf: PdfConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            database_path: default_database_path(),
            output_root: default_output_root(),
            worker_count: default_worker_count(),
            ocr: OcrConfig::default(),
            preprocess: PreprocessConfig::default(),
            translation: TranslationConfig::default(),
            pdf: PdfConfig::default(),
        }
    }
}

/// Returns `~/.pokerbook/data/pokerbook.db`, or a relative path when no
/// home directory is known.
fn default_database_path() -> String {
    dirs::home_dir()
        .map(|h| h.join(".pokerbook").join("data").join("pokerbook.db"))
        .unwrap_or_else(|| PathBuf::from("pokerbook.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_output_root() -> String {
    "output".to_string()
}

fn default_worker_count() -> usize {
    num_cpus::get()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
    #[serde(default = "default_dpi")]
    pub dpi: u32,
}

fn default_languages() -> Vec<String> {
    vec!["eng".to_string()]
}

fn default_dpi() -> u32 {
    300
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            languages: default_languages(),
            dpi: default_dpi(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessConfig {
    /// Images narrower than this are upscaled before OCR.
    #[serde(default = "default_min_width")]
    pub min_width: u32,
    #[serde(default = "default_contrast")]
    pub contrast: f32,
}

fn default_min_width() -> u32 {
    1000
}

fn default_contrast() -> f32 {
    30.0
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            min_width: default_min_width(),
            contrast: default_contrast(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_key_file: Option<String>,
    #[serde(default = "default_api_key_env_var")]
    pub api_key_env_var: Option<String>,
    #[serde(default = "default_target_language")]
    pub target_language: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_max_correction_chars")]
    pub max_correction_chars: usize,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_api_key_env_var() -> Option<String> {
    Some("OPENAI_API_KEY".to_string())
}

fn default_target_language() -> String {
    "ru".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_retry_count() -> u32 {
    3
}

fn default_chunk_size() -> usize {
    1800
}

fn default_max_correction_chars() -> usize {
    2000
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_base_url(),
            model: default_model(),
            api_key: None,
            api_key_file: None,
            api_key_env_var: default_api_key_env_var(),
            target_language: default_target_language(),
            timeout_secs: default_timeout_secs(),
            retry_count: default_retry_count(),
            chunk_size: default_chunk_size(),
            max_correction_chars: default_max_correction_chars(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfConfig {
    #[serde(default = "default_font_family")]
    pub font_family: String,
    /// Explicit TrueType file, takes precedence over `font_family`.
    #[serde(default)]
    pub font_path: Option<String>,
    #[serde(default = "default_font_size")]
    pub font_size: f32,
}

fn default_font_family() -> String {
    "DejaVu Sans".to_string()
}

fn default_font_size() -> f32 {
    11.0
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            font_family: default_font_family(),
            font_path: None,
            font_size: default_font_size(),
        }
    }
}
