use std::path::PathBuf;

use crate::config::Config;

/// Immutable settings for one book run, derived from [`Config`].
#[derive(Debug, Clone)]
pub struct ProcessingConfig {
    pub output_root: PathBuf,
    pub ocr_enabled: bool,
    pub translation_enabled: bool,
}

impl ProcessingConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            output_root: PathBuf::from(&config.output_root),
            ocr_enabled: config.ocr.enabled,
            translation_enabled: config.translation.enabled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_copies_run_settings() {
        let mut config = Config::default();
        config.output_root = "/data/books".to_string();
        config.ocr.enabled = false;
        config.translation.enabled = false;

        let processing = ProcessingConfig::from_config(&config);
        assert_eq!(processing.output_root, PathBuf::from("/data/books"));
        assert!(!processing.ocr_enabled);
        assert!(!processing.translation_enabled);
    }
}
