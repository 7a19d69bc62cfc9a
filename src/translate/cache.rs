use crate::error::Result;
use crate::faq::model::Lang;
use crate::store;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Translations keyed by `"{text}::{lang}"`, persisted as one flat JSON object.
/// Derived answers such as shortened text add a third `::{tag}` segment.
#[derive(Debug, Clone, Default)]
pub struct TranslationCache {
    path: Option<PathBuf>,
    entries: BTreeMap<String, String>,
    dirty: bool,
}

impl TranslationCache {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// A missing file gives an empty cache. So does a file that is not a
    /// JSON object of strings, after a warning.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut cache = Self {
            path: Some(path.to_path_buf()),
            ..Self::default()
        };

        if !path.exists() {
            debug!(path = %path.display(), "no translation cache yet");
            return Ok(cache);
        }

        let content = fs::read_to_string(path)?;
        match serde_json::from_str::<BTreeMap<String, String>>(content.trim_start_matches('\u{feff}')) {
            Ok(entries) => {
                debug!(path = %path.display(), entries = entries.len(), "loaded translation cache");
                cache.entries = entries;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "translation cache is unreadable, starting empty");
            }
        }

        Ok(cache)
    }

    pub fn key(text: &str, lang: Lang) -> String {
        format!("{}::{}", text, lang.code())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self, text: &str, lang: Lang) -> Option<&str> {
        self.entries.get(&Self::key(text, lang)).map(String::as_str)
    }

    pub fn insert(&mut self, text: &str, lang: Lang, translation: String) {
        self.entries.insert(Self::key(text, lang), translation);
        self.dirty = true;
    }

    pub fn get_tagged(&self, text: &str, lang: Lang, tag: &str) -> Option<&str> {
        self.entries
            .get(&format!("{}::{}", Self::key(text, lang), tag))
            .map(String::as_str)
    }

    pub fn insert_tagged(&mut self, text: &str, lang: Lang, tag: &str, value: String) {
        self.entries.insert(format!("{}::{}", Self::key(text, lang), tag), value);
        self.dirty = true;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Entries from `newer` replace existing ones with the same key.
    pub fn merge(&mut self, newer: &TranslationCache) {
        for (key, value) in &newer.entries {
            self.entries.insert(key.clone(), value.clone());
        }
        self.dirty = true;
    }

    pub fn save(&mut self) -> Result<()> {
        match self.path.clone() {
            Some(path) => self.save_to(&path),
            None => Ok(()),
        }
    }

    pub fn save_to(&mut self, path: &Path) -> Result<()> {
        store::write_json(path, &self.entries)?;
        self.dirty = false;
        debug!(path = %path.display(), entries = self.entries.len(), "saved translation cache");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let cache = TranslationCache::load(dir.path().join("cache.json")).unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_unparsable_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, "[1, 2").unwrap();

        let cache = TranslationCache::load(&path).unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");

        let mut cache = TranslationCache::load(&path).unwrap();
        cache.insert("Hej", Lang::En, "Hello".to_string());
        assert!(cache.is_dirty());
        cache.save().unwrap();
        assert!(!cache.is_dirty());

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains(r#""Hej::en": "Hello""#));

        let reloaded = TranslationCache::load(&path).unwrap();
        assert_eq!(reloaded.get("Hej", Lang::En), Some("Hello"));
        assert_eq!(reloaded.get("Hej", Lang::De), None);
    }

    #[test]
    fn test_merge_newer_wins() {
        let mut old = TranslationCache::in_memory();
        old.insert("Hej", Lang::En, "Hi".to_string());
        old.insert("Tack", Lang::En, "Thanks".to_string());

        let mut new = TranslationCache::in_memory();
        new.insert("Hej", Lang::En, "Hello".to_string());

        old.merge(&new);
        assert_eq!(old.len(), 2);
        assert_eq!(old.get("Hej", Lang::En), Some("Hello"));
    }

    #[test]
    fn test_tagged_entries_do_not_shadow_translations() {
        let mut cache = TranslationCache::in_memory();
        cache.insert("Hej", Lang::En, "Hello".to_string());
        cache.insert_tagged("Hej", Lang::En, "short", "Hi".to_string());

        assert_eq!(cache.get("Hej", Lang::En), Some("Hello"));
        assert_eq!(cache.get_tagged("Hej", Lang::En, "short"), Some("Hi"));
        assert_eq!(cache.get_tagged("Hej", Lang::En, "syn"), None);
        assert_eq!(cache.len(), 2);
    }
}
