//! JSON translation files in a workspace.
//!
//! Files are found with the configured glob patterns, nested objects are
//! flattened into separator-joined keys, and saves are written back through a
//! CST so untouched formatting survives.

use std::collections::{
    BTreeMap,
    HashMap,
};
use std::path::{
    Path,
    PathBuf,
};

use ignore::WalkBuilder;
use jsonc_parser::ParseOptions;
use jsonc_parser::cst::{
    CstInputValue,
    CstRootNode,
};
use serde_json::Value;
use thiserror::Error;

use super::{
    TranslationSink,
    TranslationStore,
};
use crate::config::{
    EditorSettings,
    MatcherError,
    TranslationFileMatcher,
};
use crate::diff::ChangeSet;
use crate::value::{
    TranslationValue,
    is_raw_condition_set,
};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to access translation file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse translation file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to flatten translation file {}: {source}", .path.display())]
    KeyCollision {
        path: PathBuf,
        #[source]
        source: DuplicateKey,
    },

    #[error("Cannot add '{key}' to {}: it overlaps the existing key '{existing}'", .path.display())]
    KeyConflict { path: PathBuf, key: String, existing: String },

    #[error("No translation file found for language '{0}'")]
    UnknownLanguage(String),

    #[error("Failed to rewrite translation file {}", .path.display())]
    Rewrite { path: PathBuf },

    #[error(transparent)]
    Matcher(#[from] MatcherError),
}

/// Two property paths in one file flatten to the same key.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("key '{key}' is defined more than once")]
pub struct DuplicateKey {
    pub key: String,
}

/// A flattened translation and the property path it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatEntry {
    /// Property names from the root object down to the value.
    pub path: Vec<String>,
    /// Raw value: a string or a condition set object.
    pub value: Value,
}

/// One locale file and its flattened entries.
#[derive(Debug, Clone)]
struct TranslationFile {
    /// Location on disk.
    path: PathBuf,
    /// Detected from the path.
    language: String,
    /// File content as last read or written.
    text: String,
    /// Flattened key to entry.
    entries: HashMap<String, FlatEntry>,
}

impl TranslationFile {
    /// Property path a key is written through.
    ///
    /// Existing keys keep the path they were read from. New keys are split on
    /// the separator and must not pass through or replace an existing entry;
    /// the overlapping key is returned otherwise.
    fn property_path(&self, key: &str, separator: &str) -> Result<Vec<String>, String> {
        if let Some(entry) = self.entries.get(key) {
            return Ok(entry.path.clone());
        }

        let path: Vec<String> = key.split(separator).map(String::from).collect();
        match self.entries.iter().find(|(_, entry)| paths_overlap(&entry.path, &path)) {
            Some((existing, _)) => Err(existing.clone()),
            None => Ok(path),
        }
    }
}

/// A change routed to its file, with the property path it is written through.
#[derive(Debug)]
struct PendingWrite {
    /// Flattened key.
    key: String,
    /// Property path inside the file.
    path: Vec<String>,
    /// New value.
    value: TranslationValue,
}

/// Store backed by the JSON locale files of a workspace.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    /// Separator used to flatten and re-nest keys.
    key_separator: String,
    /// Sorted by path. A language may span several files.
    files: Vec<TranslationFile>,
}

impl JsonFileStore {
    /// Finds and parses every translation file under `workspace_root`.
    ///
    /// `.gitignore` rules are respected. Files whose language cannot be
    /// detected from the path are skipped.
    ///
    /// # Errors
    /// - Invalid glob patterns
    /// - A matching file cannot be read or is not valid JSON
    pub fn load(workspace_root: &Path, settings: &EditorSettings) -> Result<Self, StoreError> {
        let matcher = TranslationFileMatcher::new(workspace_root.to_path_buf(), settings)?;
        let mut files = Vec::new();

        for path in find_translation_files(&matcher) {
            let Some(language) = detect_language(&path) else {
                tracing::debug!(path = %path.display(), "Skipping file without a language in its path");
                continue;
            };
            files.push(read_translation_file(path, language, &settings.key_separator)?);
        }
        files.sort_by(|a, b| a.path.cmp(&b.path));

        tracing::debug!(count = files.len(), "Loaded translation files");

        Ok(Self { key_separator: settings.key_separator.clone(), files })
    }

    /// Languages with at least one file, sorted.
    #[must_use]
    pub fn languages(&self) -> Vec<&str> {
        let mut languages: Vec<&str> = self.files.iter().map(|f| f.language.as_str()).collect();
        languages.sort_unstable();
        languages.dedup();
        languages
    }

    /// Files holding a language, in path order.
    pub fn files_for(&self, language: &str) -> impl Iterator<Item = &Path> {
        self.files.iter().filter(move |f| f.language == language).map(|f| f.path.as_path())
    }

    /// File that receives a key: the file that already holds it, otherwise
    /// the first file of the language.
    fn target_file(&self, language: &str, key: &str) -> Option<(usize, &TranslationFile)> {
        let mut first = None;
        for (index, file) in self.files.iter().enumerate() {
            if file.language != language {
                continue;
            }
            if file.entries.contains_key(key) {
                return Some((index, file));
            }
            first.get_or_insert((index, file));
        }
        first
    }

    /// Groups changes per file and resolves their property paths.
    ///
    /// Fails before anything is written if a new key overlaps an existing one.
    fn plan_writes(
        &self,
        language: &str,
        changes: ChangeSet,
    ) -> Result<BTreeMap<usize, Vec<PendingWrite>>, StoreError> {
        let mut per_file: BTreeMap<usize, Vec<PendingWrite>> = BTreeMap::new();

        for (key, value) in changes {
            let (index, file) = self
                .target_file(language, &key)
                .ok_or_else(|| StoreError::UnknownLanguage(language.to_string()))?;

            let conflict = |existing: String| StoreError::KeyConflict {
                path: file.path.clone(),
                key: key.clone(),
                existing,
            };
            let path = file.property_path(&key, &self.key_separator).map_err(conflict)?;

            let pending = per_file.entry(index).or_default();
            if let Some(other) = pending.iter().find(|w| paths_overlap(&w.path, &path)) {
                return Err(conflict(other.key.clone()));
            }
            pending.push(PendingWrite { key, path, value });
        }

        Ok(per_file)
    }
}

impl TranslationStore for JsonFileStore {
    fn keys(&self, language: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .files
            .iter()
            .filter(|f| f.language == language)
            .flat_map(|f| f.entries.keys().cloned())
            .collect();
        keys.sort_unstable();
        keys.dedup();
        keys
    }

    fn lookup(&self, language: &str, key: &str) -> Option<Value> {
        self.files
            .iter()
            .filter(|f| f.language == language)
            .find_map(|f| f.entries.get(key))
            .map(|entry| entry.value.clone())
    }
}

impl TranslationSink for JsonFileStore {
    type Error = StoreError;

    async fn persist(&mut self, language: &str, changes: ChangeSet) -> Result<(), Self::Error> {
        let per_file = self.plan_writes(language, changes)?;

        for (index, writes) in per_file {
            let Some(file) = self.files.get_mut(index) else {
                continue;
            };

            let edits: Vec<(Vec<String>, TranslationValue)> =
                writes.iter().map(|w| (w.path.clone(), w.value.clone())).collect();
            let new_text = write_values_to_json_text(&file.text, &edits)
                .ok_or_else(|| StoreError::Rewrite { path: file.path.clone() })?;

            tokio::fs::write(&file.path, &new_text)
                .await
                .map_err(|source| StoreError::Io { path: file.path.clone(), source })?;

            tracing::debug!(path = %file.path.display(), count = writes.len(), "Wrote translation file");

            file.text = new_text;
            for PendingWrite { key, path, value } in writes {
                file.entries.insert(key, FlatEntry { path, value: value.to_raw() });
            }
        }

        Ok(())
    }
}

/// Walks the workspace and collects files accepted by the matcher.
fn find_translation_files(matcher: &TranslationFileMatcher) -> Vec<PathBuf> {
    let mut found_files = Vec::new();

    for result in WalkBuilder::new(matcher.workspace_root())
        .hidden(false)
        .git_ignore(true)
        .git_exclude(true)
        .follow_links(false)
        .build()
    {
        let entry = match result {
            Ok(entry) => entry,
            Err(err) => {
                tracing::debug!(?err, "Failed to read directory entry");
                continue;
            }
        };

        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }

        if matcher.is_translation_file(entry.path()) {
            found_files.push(entry.into_path());
        }
    }

    found_files
}

/// Reads and flattens one locale file.
fn read_translation_file(
    path: PathBuf,
    language: String,
    separator: &str,
) -> Result<TranslationFile, StoreError> {
    let text = std::fs::read_to_string(&path)
        .map_err(|source| StoreError::Io { path: path.clone(), source })?;
    let json: Value = serde_json::from_str(&text)
        .map_err(|source| StoreError::Parse { path: path.clone(), source })?;

    let entries = flatten_translations(&json, separator)
        .map_err(|source| StoreError::KeyCollision { path: path.clone(), source })?;
    tracing::debug!(path = %path.display(), language = %language, count = entries.len(), "Read translation file");

    Ok(TranslationFile { path, language, text, entries })
}

/// Language of a locale file: the parent directory if it looks like a
/// language tag (`ja/app.json`), otherwise the file stem (`pt-BR.json`).
fn detect_language(path: &Path) -> Option<String> {
    let parent = path.parent().and_then(Path::file_name).and_then(|name| name.to_str());
    if let Some(parent) = parent
        && is_language_tag(parent)
    {
        return Some(parent.to_string());
    }

    let stem = path.file_stem()?.to_str()?;
    is_language_tag(stem).then(|| stem.to_string())
}

/// Loose BCP 47 shape check: a 2-3 letter primary subtag followed by
/// alphanumeric subtags joined with `-` or `_`.
fn is_language_tag(name: &str) -> bool {
    let mut subtags = name.split(['-', '_']);
    let Some(primary) = subtags.next() else {
        return false;
    };

    (2..=3).contains(&primary.len())
        && primary.chars().all(|c| c.is_ascii_alphabetic())
        && subtags.all(|s| (2..=8).contains(&s.len()) && s.chars().all(|c| c.is_ascii_alphanumeric()))
}

/// Flattens nested translation objects into separator-joined keys.
///
/// Condition set objects are kept whole. Numbers and booleans become strings.
/// Arrays and nulls are skipped. Each entry keeps the property path it came
/// from, so a literal name such as `"a.b"` can be written back in place.
///
/// # Errors
/// [`DuplicateKey`] if two paths flatten to the same key, e.g. `{"a.b": ..}`
/// next to `{"a": {"b": ..}}`.
///
/// # Examples
/// ```
/// use serde_json::json;
/// use i18n_editor::store::json::flatten_translations;
///
/// let json = json!({
///     "common": { "hello": "Hello" },
///     "items": { "param": "count", "conditions": { "_": "{count} items" } }
/// });
///
/// let flattened = flatten_translations(&json, ".").unwrap();
/// assert_eq!(flattened["common.hello"].value, json!("Hello"));
/// assert_eq!(flattened["common.hello"].path, ["common", "hello"]);
/// assert!(flattened["items"].value.is_object());
/// ```
pub fn flatten_translations(
    json: &Value,
    separator: &str,
) -> Result<HashMap<String, FlatEntry>, DuplicateKey> {
    let mut result = HashMap::new();
    flatten_value(json, separator, &mut Vec::new(), &mut result)?;
    Ok(result)
}

/// Recursive step of [`flatten_translations`].
fn flatten_value(
    json: &Value,
    separator: &str,
    path: &mut Vec<String>,
    result: &mut HashMap<String, FlatEntry>,
) -> Result<(), DuplicateKey> {
    if path.is_empty() {
        if let Value::Object(map) = json {
            for (name, value) in map {
                path.push(name.clone());
                flatten_value(value, separator, path, result)?;
                path.pop();
            }
        }
        return Ok(());
    }

    let leaf = match json {
        Value::Object(_) if is_raw_condition_set(json) => json.clone(),
        Value::Object(map) => {
            for (name, value) in map {
                path.push(name.clone());
                flatten_value(value, separator, path, result)?;
                path.pop();
            }
            return Ok(());
        }
        Value::String(_) => json.clone(),
        Value::Number(_) | Value::Bool(_) => Value::String(json.to_string()),
        Value::Array(_) | Value::Null => {
            tracing::debug!(key = %path.join(separator), "Skipping unsupported translation value");
            return Ok(());
        }
    };

    let key = path.join(separator);
    if result.contains_key(&key) {
        return Err(DuplicateKey { key });
    }
    result.insert(key, FlatEntry { path: path.clone(), value: leaf });
    Ok(())
}

/// Returns true if one path is a strict prefix of the other, so writing one
/// would pass through or replace the other.
fn paths_overlap(a: &[String], b: &[String]) -> bool {
    a.len() != b.len() && (a.starts_with(b) || b.starts_with(a))
}

/// Writes values at property paths in JSON text, creating missing parent objects.
///
/// Returns `None` if the text cannot be parsed.
#[must_use]
pub fn write_values_to_json_text(
    json_text: &str,
    edits: &[(Vec<String>, TranslationValue)],
) -> Option<String> {
    let root = CstRootNode::parse(json_text, &ParseOptions::default()).ok()?;
    let root_obj = root.object_value_or_set();

    for (path, value) in edits {
        let Some((last, parents)) = path.split_last() else {
            continue;
        };

        let mut current_obj = root_obj.clone();
        for part in parents {
            current_obj = current_obj.object_value_or_set(part);
        }

        let input = to_cst_input(value);
        match current_obj.get(last) {
            Some(prop) => prop.set_value(input),
            None => {
                current_obj.append(last, input);
            }
        }
    }

    Some(root.to_string())
}

/// Converts a value to the CST shape it is stored in.
fn to_cst_input(value: &TranslationValue) -> CstInputValue {
    match value {
        TranslationValue::PlainText(text) => CstInputValue::String(text.clone()),
        TranslationValue::ConditionSet(set) => CstInputValue::Object(vec![
            ("param".to_string(), CstInputValue::String(set.param().to_string())),
            (
                "conditions".to_string(),
                CstInputValue::Object(
                    set.iter()
                        .map(|(key, text)| (key.to_string(), CstInputValue::String(text.to_string())))
                        .collect(),
                ),
            ),
        ]),
    }
}
