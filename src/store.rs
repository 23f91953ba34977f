//! Host translation stores.
//!
//! A store is read through [`TranslationStore`] when a session opens and
//! written through [`TranslationSink`] when the session saves.

/// Locale files on disk
pub mod json;

use std::collections::HashMap;
use std::convert::Infallible;

use serde_json::Value;

use crate::diff::ChangeSet;

/// Read side of a host translation store.
pub trait TranslationStore {
    /// All translation keys known for a language.
    fn keys(&self, language: &str) -> Vec<String>;

    /// Raw value for a key, either a JSON string or a condition set object.
    fn lookup(&self, language: &str, key: &str) -> Option<Value>;
}

/// Write side of a host translation store.
///
/// `persist` is called at most once per save attempt and only ever receives
/// entries that changed.
#[allow(async_fn_in_trait)]
pub trait TranslationSink {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Persists changed entries for a language.
    ///
    /// # Errors
    /// Implementation specific; the error is handed back to the caller unmodified.
    async fn persist(&mut self, language: &str, changes: ChangeSet) -> Result<(), Self::Error>;
}

/// In-memory store keyed by language, then translation key.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    /// Language, then translation key, to raw value.
    languages: HashMap<String, HashMap<String, Value>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds every entry for a language, replacing existing keys.
    #[must_use]
    pub fn with_language<I, K>(mut self, language: &str, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        for (key, raw) in entries {
            self.insert(language, key, raw);
        }
        self
    }

    /// Stores a raw value and returns the previous one.
    pub fn insert(&mut self, language: &str, key: impl Into<String>, raw: Value) -> Option<Value> {
        self.languages.entry(language.to_string()).or_default().insert(key.into(), raw)
    }

    #[must_use]
    pub fn get(&self, language: &str, key: &str) -> Option<&Value> {
        self.languages.get(language).and_then(|entries| entries.get(key))
    }
}

impl TranslationStore for MemoryStore {
    fn keys(&self, language: &str) -> Vec<String> {
        self.languages.get(language).map(|entries| entries.keys().cloned().collect()).unwrap_or_default()
    }

    fn lookup(&self, language: &str, key: &str) -> Option<Value> {
        self.get(language, key).cloned()
    }
}

impl TranslationSink for MemoryStore {
    type Error = Infallible;

    async fn persist(&mut self, language: &str, changes: ChangeSet) -> Result<(), Self::Error> {
        tracing::debug!(language = %language, count = changes.len(), "Persisting to memory store");
        for (key, value) in changes {
            self.insert(language, key, value.to_raw());
        }
        Ok(())
    }
}
