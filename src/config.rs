//! Workspace configuration (`.i18n-editor.json`)
/// Config file loader
mod loader;
/// Configuration manager
mod manager;
/// Translation file pattern matcher
mod matcher;
/// Configuration types and settings
mod types;

pub use manager::ConfigManager;
pub use matcher::{
    MatcherError,
    TranslationFileMatcher,
};
pub use types::{
    CONFIG_FILE_NAME,
    ConfigError,
    EditorSettings,
    TranslationFilesConfig,
    ValidationError,
};
