//! Editing session for one (default language, target language) pair.

use std::collections::{
    BTreeMap,
    BTreeSet,
};

use thiserror::Error;

use crate::store::TranslationStore;
use crate::value::{
    TranslationValue,
    ValueError,
    describe_for_search,
    is_equivalent,
};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Invalid value for '{key}' in language '{language}': {source}")]
    Malformed {
        language: String,
        key: String,
        #[source]
        source: ValueError,
    },

    #[error("Unknown translation key: {0}")]
    UnknownKey(String),
}

/// One translation key under edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditableEntry {
    /// Translation key.
    key: String,
    /// Value in the default language, shown for comparison only.
    reference: Option<TranslationValue>,
    /// Snapshot taken when the session opened. Never mutated.
    original: TranslationValue,
    /// Working value the user edits.
    current: TranslationValue,
}

impl EditableEntry {
    #[must_use]
    pub fn new(
        key: impl Into<String>,
        reference: Option<TranslationValue>,
        original: TranslationValue,
    ) -> Self {
        let current = original.clone();
        Self { key: key.into(), reference, original, current }
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub const fn reference(&self) -> Option<&TranslationValue> {
        self.reference.as_ref()
    }

    #[must_use]
    pub const fn original(&self) -> &TranslationValue {
        &self.original
    }

    #[must_use]
    pub const fn current(&self) -> &TranslationValue {
        &self.current
    }

    pub const fn current_mut(&mut self) -> &mut TranslationValue {
        &mut self.current
    }

    pub fn set_current(&mut self, value: TranslationValue) {
        self.current = value;
    }

    /// Returns true if saving would write this entry.
    #[must_use]
    pub fn is_changed(&self) -> bool {
        !is_equivalent(&self.original, &self.current)
    }

    /// Case-insensitive match against the key, reference and current value.
    ///
    /// `needle` must already be lowercase.
    fn matches(&self, needle: &str) -> bool {
        self.key.to_lowercase().contains(needle)
            || self
                .reference
                .as_ref()
                .is_some_and(|value| describe_for_search(value).to_lowercase().contains(needle))
            || describe_for_search(&self.current).to_lowercase().contains(needle)
    }
}

/// Working copy of every translation key for one target language.
///
/// The key set is fixed for the lifetime of the session. Entries are
/// ordered by translation key.
#[derive(Debug, Clone)]
pub struct EditingSession {
    /// Reference language shown next to the target.
    default_language: String,
    /// Language being edited and saved.
    target_language: String,
    /// Entries keyed by translation key.
    entries: BTreeMap<String, EditableEntry>,
}

impl EditingSession {
    /// Opens a session from the store.
    ///
    /// The key set is the union of keys in the default and target languages.
    /// Keys missing from the target language start as empty text.
    ///
    /// # Errors
    /// [`SessionError::Malformed`] if a stored value cannot be converted.
    pub fn open<S>(
        store: &S,
        default_language: impl Into<String>,
        target_language: impl Into<String>,
    ) -> Result<Self, SessionError>
    where
        S: TranslationStore + ?Sized,
    {
        let default_language = default_language.into();
        let target_language = target_language.into();
        let entries = load_entries(store, &default_language, &target_language)?;

        tracing::debug!(
            default_language = %default_language,
            target_language = %target_language,
            count = entries.len(),
            "Opened editing session"
        );

        Ok(Self { default_language, target_language, entries })
    }

    /// Discards every entry and reloads them for a new target language.
    ///
    /// The session is left unchanged on error.
    ///
    /// # Errors
    /// [`SessionError::Malformed`] if a stored value cannot be converted.
    pub fn retarget<S>(
        &mut self,
        store: &S,
        target_language: impl Into<String>,
    ) -> Result<(), SessionError>
    where
        S: TranslationStore + ?Sized,
    {
        let target_language = target_language.into();
        self.entries = load_entries(store, &self.default_language, &target_language)?;
        tracing::debug!(target_language = %target_language, "Switched target language");
        self.target_language = target_language;
        Ok(())
    }

    #[must_use]
    pub fn default_language(&self) -> &str {
        &self.default_language
    }

    #[must_use]
    pub fn target_language(&self) -> &str {
        &self.target_language
    }

    /// Entries in key order.
    pub fn entries(&self) -> impl Iterator<Item = &EditableEntry> {
        self.entries.values()
    }

    #[must_use]
    pub fn entry(&self, key: &str) -> Option<&EditableEntry> {
        self.entries.get(key)
    }

    pub fn entry_mut(&mut self, key: &str) -> Option<&mut EditableEntry> {
        self.entries.get_mut(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replaces the current value of a key.
    ///
    /// # Errors
    /// [`SessionError::UnknownKey`] if the key is not part of the session.
    pub fn set_current(&mut self, key: &str, value: TranslationValue) -> Result<(), SessionError> {
        self.require_entry(key)?.set_current(value);
        Ok(())
    }

    /// Turns the current plain text into a condition set with a single `_` condition.
    ///
    /// # Errors
    /// [`SessionError::UnknownKey`] if the key is not part of the session.
    pub fn convert_to_conditional(
        &mut self,
        key: &str,
        param: impl Into<String>,
    ) -> Result<(), SessionError> {
        let entry = self.require_entry(key)?;
        entry.current = std::mem::take(&mut entry.current).into_conditional(param);
        Ok(())
    }

    /// Collapses the current condition set to its fallback text.
    ///
    /// # Errors
    /// [`SessionError::UnknownKey`] if the key is not part of the session.
    pub fn convert_to_plain(&mut self, key: &str) -> Result<(), SessionError> {
        let entry = self.require_entry(key)?;
        entry.current = std::mem::take(&mut entry.current).into_plain();
        Ok(())
    }

    /// Restores the snapshot taken when the session opened.
    ///
    /// # Errors
    /// [`SessionError::UnknownKey`] if the key is not part of the session.
    pub fn revert(&mut self, key: &str) -> Result<(), SessionError> {
        let entry = self.require_entry(key)?;
        entry.current = entry.original.clone();
        Ok(())
    }

    /// Keys whose current value differs from the snapshot, in key order.
    #[must_use]
    pub fn changed_keys(&self) -> Vec<&str> {
        self.entries().filter(|entry| entry.is_changed()).map(EditableEntry::key).collect()
    }

    /// Entries whose key, reference or current value contains `query`, ignoring case.
    ///
    /// A blank query matches every entry.
    #[must_use]
    pub fn filter(&self, query: &str) -> Vec<&EditableEntry> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.entries().collect();
        }
        self.entries().filter(|entry| entry.matches(&needle)).collect()
    }

    /// Entry for a key that must exist.
    fn require_entry(&mut self, key: &str) -> Result<&mut EditableEntry, SessionError> {
        self.entries.get_mut(key).ok_or_else(|| SessionError::UnknownKey(key.to_string()))
    }
}

/// Builds one entry per key found in either language.
fn load_entries<S>(
    store: &S,
    default_language: &str,
    target_language: &str,
) -> Result<BTreeMap<String, EditableEntry>, SessionError>
where
    S: TranslationStore + ?Sized,
{
    let keys: BTreeSet<String> =
        store.keys(default_language).into_iter().chain(store.keys(target_language)).collect();

    keys.into_iter()
        .map(|key| {
            let reference = read_value(store, default_language, &key)?;
            let original = read_value(store, target_language, &key)?.unwrap_or_default();
            Ok((key.clone(), EditableEntry::new(key, reference, original)))
        })
        .collect()
}

fn read_value<S>(
    store: &S,
    language: &str,
    key: &str,
) -> Result<Option<TranslationValue>, SessionError>
where
    S: TranslationStore + ?Sized,
{
    store
        .lookup(language, key)
        .map(|raw| {
            TranslationValue::from_raw(&raw).map_err(|source| SessionError::Malformed {
                language: language.to_string(),
                key: key.to_string(),
                source,
            })
        })
        .transpose()
}
