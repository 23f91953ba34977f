//! Translation values: plain text or a parameterized condition set.
//!
//! Values arrive from a host store as untyped JSON and are converted once at
//! the boundary with [`TranslationValue::from_raw`]. Everything downstream
//! dispatches on the variant.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::{
    Deserialize,
    Serialize,
};
use serde_json::Value;
use thiserror::Error;

/// Fallback condition key used when no numeric condition matches.
pub const FALLBACK_KEY: &str = "_";

/// Alternative spelling of the fallback condition key.
pub const DEFAULT_KEY: &str = "default";

/// Member holding the condition map of a raw condition set.
const CONDITIONS_FIELD: &str = "conditions";

/// Member holding the parameter name of a raw condition set.
const PARAM_FIELD: &str = "param";

/// Errors raised while converting a raw store value.
#[derive(Error, Debug)]
pub enum ValueError {
    /// The raw value is neither a string nor a condition set object.
    #[error("Unsupported raw translation value of type {0}")]
    UnsupportedRaw(&'static str),
    /// The raw object looked like a condition set but did not match its shape.
    #[error("Malformed condition set: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Key of a single condition.
///
/// Ordering is the canonical presentation order: numeric keys first in
/// ascending numeric order, then every other key in lexicographic order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConditionKey(String);

impl ConditionKey {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }

    /// Numeric value of the key, or `None` for sentinels and other text.
    #[must_use]
    pub fn numeric(&self) -> Option<u128> {
        if self.0.is_empty() || !self.0.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        self.0.parse().ok()
    }

    /// Returns true for `_` and `default`.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.0 == FALLBACK_KEY || self.0 == DEFAULT_KEY
    }
}

impl Ord for ConditionKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.numeric(), other.numeric()) {
            // "1" and "01" are numerically equal; fall back to the text so the order stays total
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for ConditionKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ConditionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConditionKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for ConditionKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// A parameterized translation: one text per condition key.
///
/// Conditions are always iterated in canonical key order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConditionSet {
    /// Name of the runtime substitution variable (e.g. `count`).
    pub(crate) param: String,
    /// Condition key to text, ordered canonically.
    pub(crate) conditions: BTreeMap<ConditionKey, String>,
}

impl ConditionSet {
    /// Creates an empty condition set. Add at least one condition before saving.
    #[must_use]
    pub fn new(param: impl Into<String>) -> Self {
        Self { param: param.into(), conditions: BTreeMap::new() }
    }

    /// Creates a condition set holding a single fallback (`_`) condition.
    #[must_use]
    pub fn with_fallback(param: impl Into<String>, text: impl Into<String>) -> Self {
        let mut conditions = BTreeMap::new();
        conditions.insert(ConditionKey::from(FALLBACK_KEY), text.into());
        Self { param: param.into(), conditions }
    }

    /// Builds a condition set from key/text pairs. Later pairs replace earlier ones.
    #[must_use]
    pub fn from_conditions<I, K, V>(param: impl Into<String>, conditions: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<ConditionKey>,
        V: Into<String>,
    {
        Self {
            param: param.into(),
            conditions: conditions.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    #[must_use]
    pub fn param(&self) -> &str {
        &self.param
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.conditions.get(&ConditionKey::from(key)).map(String::as_str)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.conditions.contains_key(&ConditionKey::from(key))
    }

    /// Condition keys in canonical order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.conditions.keys().map(ConditionKey::as_str)
    }

    /// Conditions in canonical key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.conditions.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Text used when no numeric condition matches.
    ///
    /// Prefers `_`, then `default`, then the first condition in canonical order.
    #[must_use]
    pub fn fallback(&self) -> Option<&str> {
        self.get(FALLBACK_KEY)
            .or_else(|| self.get(DEFAULT_KEY))
            .or_else(|| self.conditions.values().next().map(String::as_str))
    }
}

/// Value stored for one translation key in one language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TranslationValue {
    PlainText(String),
    ConditionSet(ConditionSet),
}

impl Default for TranslationValue {
    fn default() -> Self {
        Self::PlainText(String::new())
    }
}

impl TranslationValue {
    /// Converts a raw store value.
    ///
    /// Strings become plain text. Objects with a `conditions` member become
    /// condition sets of the shape `{"param": "count", "conditions": {"0": "..."}}`.
    ///
    /// # Errors
    /// - [`ValueError::UnsupportedRaw`] for numbers, booleans, null, arrays and plain objects
    /// - [`ValueError::Malformed`] for condition set objects with a wrong shape
    pub fn from_raw(raw: &Value) -> Result<Self, ValueError> {
        match raw {
            Value::String(text) => Ok(Self::PlainText(text.clone())),
            Value::Object(map) if map.contains_key(CONDITIONS_FIELD) => {
                Ok(Self::ConditionSet(ConditionSet::deserialize(raw)?))
            }
            other => Err(ValueError::UnsupportedRaw(raw_type_name(other))),
        }
    }

    /// Converts back to the raw store representation accepted by [`Self::from_raw`].
    #[must_use]
    pub fn to_raw(&self) -> Value {
        match self {
            Self::PlainText(text) => Value::String(text.clone()),
            Self::ConditionSet(set) => {
                let conditions: serde_json::Map<String, Value> = set
                    .iter()
                    .map(|(key, text)| (key.to_string(), Value::String(text.to_string())))
                    .collect();
                let mut object = serde_json::Map::new();
                object.insert(PARAM_FIELD.to_string(), Value::String(set.param.clone()));
                object.insert(CONDITIONS_FIELD.to_string(), Value::Object(conditions));
                Value::Object(object)
            }
        }
    }

    #[must_use]
    pub const fn is_conditional(&self) -> bool {
        matches!(self, Self::ConditionSet(_))
    }

    #[must_use]
    pub fn as_plain_text(&self) -> Option<&str> {
        match self {
            Self::PlainText(text) => Some(text),
            Self::ConditionSet(_) => None,
        }
    }

    #[must_use]
    pub const fn as_condition_set(&self) -> Option<&ConditionSet> {
        match self {
            Self::ConditionSet(set) => Some(set),
            Self::PlainText(_) => None,
        }
    }

    pub fn as_condition_set_mut(&mut self) -> Option<&mut ConditionSet> {
        match self {
            Self::ConditionSet(set) => Some(set),
            Self::PlainText(_) => None,
        }
    }

    /// Plain text becomes a condition set whose `_` condition holds the text.
    /// Condition sets are returned unchanged.
    #[must_use]
    pub fn into_conditional(self, param: impl Into<String>) -> Self {
        match self {
            Self::PlainText(text) => Self::ConditionSet(ConditionSet::with_fallback(param, text)),
            set @ Self::ConditionSet(_) => set,
        }
    }

    /// Condition sets collapse to their fallback text. Plain text is returned unchanged.
    #[must_use]
    pub fn into_plain(self) -> Self {
        match self {
            Self::ConditionSet(set) => Self::PlainText(set.fallback().unwrap_or_default().to_string()),
            text @ Self::PlainText(_) => text,
        }
    }
}

impl From<&str> for TranslationValue {
    fn from(text: &str) -> Self {
        Self::PlainText(text.to_string())
    }
}

impl From<String> for TranslationValue {
    fn from(text: String) -> Self {
        Self::PlainText(text)
    }
}

impl From<ConditionSet> for TranslationValue {
    fn from(set: ConditionSet) -> Self {
        Self::ConditionSet(set)
    }
}

/// Returns true if the raw JSON value is a condition set object rather than a nested group.
///
/// Only the exact shape counts: a string `param`, an object of strings under
/// `conditions`, and no other members. A group that merely has a translation
/// named `conditions` is not a condition set.
#[must_use]
pub fn is_raw_condition_set(raw: &Value) -> bool {
    let Some(map) = raw.as_object() else {
        return false;
    };

    map.len() == 2
        && map.get(PARAM_FIELD).is_some_and(Value::is_string)
        && map
            .get(CONDITIONS_FIELD)
            .and_then(Value::as_object)
            .is_some_and(|conditions| conditions.values().all(Value::is_string))
}

/// JSON type name for error messages.
const fn raw_type_name(raw: &Value) -> &'static str {
    match raw {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Returns true if both values would be persisted identically.
///
/// A variant change always counts as a difference. Plain text is compared
/// byte for byte with no trimming or normalization.
#[must_use]
pub fn is_equivalent(a: &TranslationValue, b: &TranslationValue) -> bool {
    match (a, b) {
        (TranslationValue::PlainText(a), TranslationValue::PlainText(b)) => a == b,
        (TranslationValue::ConditionSet(a), TranslationValue::ConditionSet(b)) => {
            a.param == b.param
                && a.conditions.len() == b.conditions.len()
                && a.conditions.iter().all(|(key, text)| b.conditions.get(key) == Some(text))
        }
        _ => false,
    }
}

/// Sorts condition keys into canonical presentation order.
///
/// Numeric keys ascend numerically, sentinels and other text follow in
/// lexicographic order. The sort is stable, so sorting twice is a no-op.
#[must_use]
pub fn sort_condition_keys<I, S>(keys: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut keys: Vec<ConditionKey> = keys.into_iter().map(|k| ConditionKey(k.into())).collect();
    keys.sort();
    keys.into_iter().map(ConditionKey::into_string).collect()
}

/// Text used for search and filtering.
///
/// Plain text is returned as-is; condition sets produce a label listing the
/// parameter and every condition key, e.g. `count: 0, 1, _`.
#[must_use]
pub fn describe_for_search(value: &TranslationValue) -> String {
    match value {
        TranslationValue::PlainText(text) => text.clone(),
        TranslationValue::ConditionSet(set) => {
            format!("{}: {}", set.param, set.keys().collect::<Vec<_>>().join(", "))
        }
    }
}
