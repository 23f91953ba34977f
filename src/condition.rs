//! Editing rules for condition sets.
//!
//! Mutation is unconstrained while the user types; [`ConditionSet::validate_for_save`]
//! is the single gate applied before a save. Only key insertion is checked eagerly,
//! since a duplicate key would silently overwrite another condition.

use thiserror::Error;

use crate::value::{
    ConditionKey,
    ConditionSet,
};

/// Errors raised while editing or saving a condition set.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConditionError {
    #[error("Condition key cannot be empty")]
    EmptyKey,

    #[error("Condition '{0}' already exists")]
    DuplicateKey(String),

    #[error("Parameter name cannot be empty")]
    EmptyParam,

    #[error("At least one condition is required")]
    NoConditions,

    #[error("Text for condition '{0}' cannot be empty")]
    EmptyValue(String),

    /// Both `_` and `default` are present, so the fallback text is ambiguous.
    #[error("Only one fallback condition is allowed: remove either '_' or 'default'")]
    AmbiguousFallback,
}

impl ConditionSet {
    /// Adds a condition. The key is trimmed before insertion.
    ///
    /// The set is left untouched on error.
    ///
    /// # Errors
    /// - [`ConditionError::EmptyKey`] if the key is blank
    /// - [`ConditionError::DuplicateKey`] if the key already exists
    pub fn add_condition(
        &mut self,
        key: &str,
        value: impl Into<String>,
    ) -> Result<(), ConditionError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(ConditionError::EmptyKey);
        }

        let key = ConditionKey::from(key);
        if self.conditions.contains_key(&key) {
            return Err(ConditionError::DuplicateKey(key.into_string()));
        }

        self.conditions.insert(key, value.into());
        Ok(())
    }

    /// Removes a condition, returning its text. Absent keys are ignored.
    pub fn remove_condition(&mut self, key: &str) -> Option<String> {
        self.conditions.remove(&ConditionKey::from(key))
    }

    pub fn set_param(&mut self, param: impl Into<String>) {
        self.param = param.into();
    }

    /// Replaces the text of an existing condition and returns the previous text.
    ///
    /// Returns `None` and changes nothing if the key does not exist.
    pub fn set_condition_value(&mut self, key: &str, value: impl Into<String>) -> Option<String> {
        self.conditions
            .get_mut(&ConditionKey::from(key))
            .map(|text| std::mem::replace(text, value.into()))
    }

    /// Checks that the set can be saved.
    ///
    /// Checks run in a fixed order and the first failure is reported. Blank
    /// texts are reported for the first key in canonical order.
    ///
    /// # Errors
    /// - [`ConditionError::EmptyParam`]
    /// - [`ConditionError::NoConditions`]
    /// - [`ConditionError::EmptyValue`]
    /// - [`ConditionError::AmbiguousFallback`]
    pub fn validate_for_save(&self) -> Result<(), ConditionError> {
        if self.param.trim().is_empty() {
            return Err(ConditionError::EmptyParam);
        }

        if self.conditions.is_empty() {
            return Err(ConditionError::NoConditions);
        }

        if let Some((key, _)) = self.conditions.iter().find(|(_, text)| text.trim().is_empty()) {
            return Err(ConditionError::EmptyValue(key.to_string()));
        }

        if self.conditions.keys().filter(|key| key.is_fallback()).count() > 1 {
            return Err(ConditionError::AmbiguousFallback);
        }

        Ok(())
    }
}
