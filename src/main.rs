//! Applies an edits file to one target language and saves the changed keys.
//!
//! ```text
//! i18n-editor <target-language> <edits.json> [workspace-root]
//! ```
//!
//! The edits file is a JSON object mapping translation keys to values, in the
//! same shape the locale files use (a string, or a condition set object).

use std::path::{
    Path,
    PathBuf,
};
use std::process::ExitCode;

use i18n_editor::config::{
    ConfigError,
    ConfigManager,
};
use i18n_editor::store::json::{
    JsonFileStore,
    StoreError,
};
use i18n_editor::{
    EditingSession,
    SaveError,
    SaveOutcome,
    SessionError,
    TranslationValue,
    ValueError,
};
use serde_json::{
    Map,
    Value,
};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Anything that stops the run. Logged once, then the process exits with failure.
#[derive(Error, Debug)]
enum CliError {
    #[error("Usage: i18n-editor <target-language> <edits.json> [workspace-root]")]
    Usage,

    #[error("Failed to resolve the current directory: {0}")]
    CurrentDir(#[source] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Failed to read edits file {}: {source}", .path.display())]
    EditsRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse edits file {}: {source}", .path.display())]
    EditsParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Edits file {} must contain a JSON object", .path.display())]
    EditsFormat { path: PathBuf },

    #[error("Invalid value for '{key}': {source}")]
    InvalidEdit {
        key: String,
        #[source]
        source: ValueError,
    },

    #[error(transparent)]
    Save(#[from] SaveError<StoreError>),
}

/// Command line arguments.
#[derive(Debug, PartialEq, Eq)]
struct Args {
    /// Language to edit.
    target_language: String,
    /// JSON object of key to raw value.
    edits_path: PathBuf,
    /// Defaults to the current directory.
    workspace_root: Option<PathBuf>,
}

impl Args {
    /// Parses arguments without the program name.
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self, CliError> {
        let target_language = args.next().ok_or(CliError::Usage)?;
        let edits_path = args.next().map(PathBuf::from).ok_or(CliError::Usage)?;
        let workspace_root = args.next().map(PathBuf::from);

        if args.next().is_some() || target_language.trim().is_empty() {
            return Err(CliError::Usage);
        }

        Ok(Self { target_language, edits_path, workspace_root })
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = match Args::parse(std::env::args().skip(1)) {
        Ok(args) => run(args).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(SaveOutcome::NoChanges) => {
            tracing::info!("No changes to save");
            ExitCode::SUCCESS
        }
        Ok(SaveOutcome::Saved { language, count }) => {
            tracing::info!(language = %language, count, "Saved translations");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Loads the workspace, applies the edits and saves.
async fn run(args: Args) -> Result<SaveOutcome, CliError> {
    let workspace_root = match args.workspace_root {
        Some(root) => root,
        None => std::env::current_dir().map_err(CliError::CurrentDir)?,
    };

    let mut config_manager = ConfigManager::new();
    config_manager.load_settings(Some(workspace_root.clone()))?;
    let settings = config_manager.get_settings();

    let mut store = JsonFileStore::load(&workspace_root, settings)?;
    tracing::info!(languages = ?store.languages(), "Loaded translation files");

    let mut session =
        EditingSession::open(&store, &settings.default_language, &args.target_language)?;

    let edits = read_edits(&args.edits_path).await?;
    let applied = apply_edits(&mut session, edits)?;
    tracing::debug!(applied, changed = session.changed_keys().len(), "Applied edits");

    session.save(&mut store).await.map_err(|failure| CliError::Save(failure.error))
}

/// Reads the edits file as a JSON object.
async fn read_edits(path: &Path) -> Result<Map<String, Value>, CliError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CliError::EditsRead { path: path.to_path_buf(), source })?;
    let json: Value = serde_json::from_str(&text)
        .map_err(|source| CliError::EditsParse { path: path.to_path_buf(), source })?;

    match json {
        Value::Object(map) => Ok(map),
        _ => Err(CliError::EditsFormat { path: path.to_path_buf() }),
    }
}

/// Sets each edit as the current value of its key.
///
/// Keys outside the session are skipped with a warning. Returns the number of
/// edits applied.
fn apply_edits(
    session: &mut EditingSession,
    edits: Map<String, Value>,
) -> Result<usize, CliError> {
    let mut applied = 0;

    for (key, raw) in edits {
        let value = TranslationValue::from_raw(&raw)
            .map_err(|source| CliError::InvalidEdit { key: key.clone(), source })?;

        match session.set_current(&key, value) {
            Ok(()) => applied += 1,
            Err(SessionError::UnknownKey(key)) => {
                tracing::warn!(key = %key, "Skipping edit for a key missing from both languages");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(applied)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use googletest::prelude::*;
    use i18n_editor::MemoryStore;
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn args(values: &[&str]) -> impl Iterator<Item = String> {
        values.iter().map(ToString::to_string).collect::<Vec<_>>().into_iter()
    }

    #[rstest]
    fn parse_args_with_workspace_root() {
        let parsed = Args::parse(args(&["ja", "edits.json", "/ws"])).unwrap();

        assert_eq!(
            parsed,
            Args {
                target_language: "ja".to_string(),
                edits_path: PathBuf::from("edits.json"),
                workspace_root: Some(PathBuf::from("/ws")),
            }
        );
    }

    #[rstest]
    #[case::missing_all(&[])]
    #[case::missing_edits(&["ja"])]
    #[case::too_many(&["ja", "edits.json", "/ws", "extra"])]
    #[case::blank_language(&[" ", "edits.json"])]
    fn parse_args_rejects_bad_usage(#[case] values: &[&str]) {
        assert!(matches!(Args::parse(args(values)), Err(CliError::Usage)));
    }

    #[googletest::test]
    fn apply_edits_skips_unknown_keys() {
        let store = MemoryStore::new()
            .with_language("en", [("hello", json!("Hello")), ("bye", json!("Bye"))]);
        let mut session = EditingSession::open(&store, "en", "ja").unwrap();
        let edits = json!({ "hello": "こんにちは", "missing": "?" });
        let Value::Object(edits) = edits else { panic!("object literal") };

        let applied = apply_edits(&mut session, edits).unwrap();

        expect_that!(applied, eq(1));
        expect_that!(session.changed_keys(), elements_are![eq(&"hello")]);
    }

    #[googletest::test]
    fn apply_edits_rejects_unsupported_values() {
        let store = MemoryStore::new().with_language("en", [("count", json!("Count"))]);
        let mut session = EditingSession::open(&store, "en", "ja").unwrap();
        let Value::Object(edits) = json!({ "count": 3 }) else { panic!("object literal") };

        let result = apply_edits(&mut session, edits);

        expect_that!(
            matches!(result, Err(CliError::InvalidEdit { ref key, .. }) if key == "count"),
            eq(true)
        );
    }
}
