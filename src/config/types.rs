use serde::{
    Deserialize,
    Serialize,
};
use thiserror::Error;

/// Name of the configuration file at the workspace root.
pub const CONFIG_FILE_NAME: &str = ".i18n-editor.json";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Configuration error in '{field_path}': {message}")]
pub struct ValidationError {
    /// JSON path to the field (e.g., "translationFiles.includePatterns[0]")
    pub field_path: String,
    pub message: String,
}

impl ValidationError {
    #[must_use]
    pub fn new(field_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field_path: field_path.into(), message: message.into() }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    ValidationErrors(Vec<ValidationError>),

    #[error("Failed to load configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .enumerate()
        .map(|(i, err)| format!("  {}. {} - {}", i + 1, err.field_path, err.message))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorSettings {
    pub translation_files: TranslationFilesConfig,

    /// Separator used to flatten nested translation objects into keys.
    pub key_separator: String,

    /// Reference language shown next to the language being edited.
    pub default_language: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TranslationFilesConfig {
    /// Globs relative to the workspace root.
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
}

impl Default for TranslationFilesConfig {
    fn default() -> Self {
        Self {
            include_patterns: vec!["**/{locales,messages,i18n}/**/*.json".to_string()],
            exclude_patterns: vec!["**/node_modules/**".to_string()],
        }
    }
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            translation_files: TranslationFilesConfig::default(),
            key_separator: ".".to_string(),
            default_language: "en".to_string(),
        }
    }
}

impl EditorSettings {
    /// # Errors
    /// - Required field is empty
    /// - Invalid glob pattern
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.key_separator.is_empty() {
            errors.push(ValidationError::new(
                "keySeparator",
                "The separator cannot be empty. Please specify a separator, for example: \".\" (dot)",
            ));
        }

        if self.default_language.trim().is_empty() {
            errors.push(ValidationError::new(
                "defaultLanguage",
                "The default language cannot be empty. Example: \"en\"",
            ));
        }

        if self.translation_files.include_patterns.is_empty() {
            errors.push(ValidationError::new(
                "translationFiles.includePatterns",
                "At least one pattern is required. Example: [\"**/locales/*.json\"]",
            ));
        }

        let patterns = [
            ("translationFiles.includePatterns", &self.translation_files.include_patterns),
            ("translationFiles.excludePatterns", &self.translation_files.exclude_patterns),
        ];
        for (field, patterns) in patterns {
            for (index, pattern) in patterns.iter().enumerate() {
                if let Err(e) = globset::Glob::new(pattern) {
                    errors.push(ValidationError::new(
                        format!("{field}[{index}]"),
                        format!("Invalid glob pattern '{pattern}': {e}"),
                    ));
                }
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::expect_used, clippy::panic)]
mod tests {
    use googletest::prelude::*;
    use rstest::*;

    use super::*;

    #[rstest]
    fn validate_valid_settings() {
        let settings = EditorSettings::default();

        assert_that!(settings.validate(), ok(anything()));
    }

    #[rstest]
    fn deserialize_partial_settings() {
        let json = r#"{"defaultLanguage": "ja"}"#;

        let settings: EditorSettings = serde_json::from_str(json).unwrap();

        assert_that!(settings.default_language, eq("ja"));
        assert_that!(settings.key_separator, eq("."));
        assert_that!(settings.translation_files.include_patterns, len(eq(1)));
    }

    #[rstest]
    fn deserialize_empty_settings() {
        let settings: EditorSettings = serde_json::from_str("{}").unwrap();

        assert_that!(settings.key_separator, eq("."));
        assert_that!(settings.default_language, eq("en"));
        assert_that!(
            settings.translation_files.include_patterns,
            elements_are![eq("**/{locales,messages,i18n}/**/*.json")]
        );
        assert_that!(
            settings.translation_files.exclude_patterns,
            elements_are![eq("**/node_modules/**")]
        );
    }

    #[rstest]
    fn validate_invalid_key_separator_empty() {
        let settings =
            EditorSettings { key_separator: String::new(), ..EditorSettings::default() };
        let result = settings.validate();

        assert_that!(
            result,
            err(elements_are![all![
                field!(ValidationError.field_path, eq("keySeparator")),
                field!(ValidationError.message, contains_substring("cannot be empty"))
            ]])
        );
    }

    #[rstest]
    fn validate_invalid_default_language_blank() {
        let settings =
            EditorSettings { default_language: "  ".to_string(), ..EditorSettings::default() };
        let result = settings.validate();

        assert_that!(
            result,
            err(elements_are![field!(ValidationError.field_path, eq("defaultLanguage"))])
        );
    }

    #[rstest]
    fn validate_invalid_include_patterns_empty() {
        let settings = EditorSettings {
            translation_files: TranslationFilesConfig {
                include_patterns: vec![],
                ..TranslationFilesConfig::default()
            },
            ..EditorSettings::default()
        };
        let result = settings.validate();

        assert_that!(
            result,
            err(elements_are![all![
                field!(ValidationError.field_path, eq("translationFiles.includePatterns")),
                field!(ValidationError.message, contains_substring("At least one pattern"))
            ]])
        );
    }

    #[rstest]
    fn validate_invalid_exclude_pattern_invalid_glob() {
        let settings = EditorSettings {
            translation_files: TranslationFilesConfig {
                exclude_patterns: vec!["dist/**".to_string(), "invalid[pattern".to_string()],
                ..TranslationFilesConfig::default()
            },
            ..EditorSettings::default()
        };

        let result = settings.validate();

        assert_that!(
            result,
            err(elements_are![all![
                field!(ValidationError.field_path, eq("translationFiles.excludePatterns[1]")),
                field!(ValidationError.message, contains_substring("Invalid glob pattern")),
                field!(ValidationError.message, contains_substring("invalid[pattern"))
            ]])
        );
    }

    #[rstest]
    fn config_error_validation_errors_format() {
        let settings = EditorSettings {
            key_separator: String::new(),
            default_language: String::new(),
            ..EditorSettings::default()
        };

        let errors = settings.validate().unwrap_err();
        let config_error = ConfigError::ValidationErrors(errors);

        let error_message = format!("{config_error}");
        assert_that!(error_message, contains_substring("Configuration validation failed"));
        assert_that!(error_message, contains_substring("1. keySeparator"));
        assert_that!(error_message, contains_substring("2. defaultLanguage"));
    }
}
