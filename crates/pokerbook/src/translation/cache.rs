use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use moka::sync::Cache;

use super::{Purpose, TranslationError, Translator};

const MAX_ENTRIES: u64 = 50_000;

/// Memoizes another translator by `{purpose}:{text}`. Entries can be loaded
/// from and saved to a JSON file so reprocessing a book reuses earlier
/// responses.
pub struct CachedTranslator<'a> {
    inner: &'a dyn Translator,
    cache: Cache<String, String>,
    path: Option<PathBuf>,
}

impl<'a> CachedTranslator<'a> {
    pub fn new(inner: &'a dyn Translator) -> Self {
        Self {
            inner,
            cache: Cache::new(MAX_ENTRIES),
            path: None,
        }
    }

    /// Loads entries from `path` if it exists; unreadable files are logged
    /// and ignored. [`save`](Self::save) writes back to the same path.
    pub fn with_file(inner: &'a dyn Translator, path: &Path) -> Self {
        let mut translator = Self::new(inner);
        translator.path = Some(path.to_path_buf());

        match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<BTreeMap<String, String>>(&content) {
                Ok(entries) => {
                    let count = entries.len();
                    for (key, value) in entries {
                        translator.cache.insert(key, value);
                    }
                    tracing::debug!(count, "Loaded cached translations");
                }
                Err(e) => tracing::warn!(error = %e, "Ignoring corrupt translation cache"),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(error = %e, "Failed to read translation cache"),
        }

        translator
    }

    pub fn len(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Writes all entries to the backing file. Failures are logged only.
    pub fn save(&self) {
        let Some(path) = &self.path else {
            return;
        };

        self.cache.run_pending_tasks();
        let entries: BTreeMap<String, String> = self
            .cache
            .iter()
            .map(|(key, value)| ((*key).clone(), value))
            .collect();

        if let Err(e) = crate::storage::layout::write_json(path, &entries) {
            tracing::warn!(error = %e, "Failed to save translation cache");
        }
    }

    fn key(text: &str, purpose: Purpose) -> String {
        format!("{}:{}", purpose.as_str(), text)
    }
}

impl Translator for CachedTranslator<'_> {
    fn is_available(&self) -> bool {
        self.inner.is_available()
    }

    fn translate(&self, text: &str, purpose: Purpose) -> Result<String, TranslationError> {
        if text.trim().is_empty() {
            return Ok(String::new());
        }

        let key = Self::key(text, purpose);
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit);
        }

        let translated = self.inner.translate(text, purpose)?;
        self.cache.insert(key, translated.clone());
        Ok(translated)
    }
}
