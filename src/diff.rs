//! Change detection and the save protocol.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::condition::ConditionError;
use crate::session::EditingSession;
use crate::store::TranslationSink;
use crate::value::TranslationValue;

/// Changed entries keyed by translation key.
pub type ChangeSet = BTreeMap<String, TranslationValue>;

/// Result of a save that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Nothing differed from the snapshot; the sink was not called.
    NoChanges,
    Saved { language: String, count: usize },
}

#[derive(Error, Debug)]
pub enum SaveError<E>
where
    E: std::error::Error + 'static,
{
    #[error("Cannot save '{key}': {source}")]
    Invalid {
        key: String,
        #[source]
        source: ConditionError,
    },

    #[error("Failed to persist changes: {0}")]
    Persist(#[source] E),
}

/// A failed save. Hands the untouched session back so the user can fix it or retry.
#[derive(Error, Debug)]
#[error("Failed to save translations for '{}'", .session.target_language())]
pub struct SaveFailure<E>
where
    E: std::error::Error + 'static,
{
    pub session: EditingSession,
    #[source]
    pub error: SaveError<E>,
}

/// Entries whose current value is not equivalent to the snapshot.
#[must_use]
pub fn compute_changes(session: &EditingSession) -> ChangeSet {
    session
        .entries()
        .filter(|entry| entry.is_changed())
        .map(|entry| (entry.key().to_string(), entry.current().clone()))
        .collect()
}

impl EditingSession {
    /// Validates, diffs and persists the session.
    ///
    /// Only changed condition sets are validated. When nothing changed the
    /// sink is not called. Otherwise the sink is called exactly once with the
    /// change set. The session is consumed on success.
    ///
    /// # Errors
    /// Returns the session together with [`SaveError::Invalid`] for the first
    /// invalid changed entry in key order, or [`SaveError::Persist`] with the
    /// sink's error unmodified. Nothing is retried or rolled back.
    pub async fn save<S>(self, sink: &mut S) -> Result<SaveOutcome, SaveFailure<S::Error>>
    where
        S: TranslationSink,
    {
        if let Some((key, source)) = self.first_invalid_change() {
            tracing::debug!(key = %key, error = %source, "Refusing to save invalid entry");
            return Err(SaveFailure { session: self, error: SaveError::Invalid { key, source } });
        }

        let changes = compute_changes(&self);
        if changes.is_empty() {
            tracing::debug!(language = %self.target_language(), "No changes to save");
            return Ok(SaveOutcome::NoChanges);
        }

        let count = changes.len();
        tracing::debug!(language = %self.target_language(), count, "Saving changes");

        let result = sink.persist(self.target_language(), changes).await;
        match result {
            Ok(()) => {
                Ok(SaveOutcome::Saved { language: self.target_language().to_string(), count })
            }
            Err(e) => Err(SaveFailure { session: self, error: SaveError::Persist(e) }),
        }
    }

    /// First changed condition set that fails validation, in key order.
    fn first_invalid_change(&self) -> Option<(String, ConditionError)> {
        self.entries().filter(|entry| entry.is_changed()).find_map(|entry| {
            let set = entry.current().as_condition_set()?;
            set.validate_for_save().err().map(|error| (entry.key().to_string(), error))
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use googletest::prelude::*;
    use serde_json::json;

    use super::*;
    use crate::store::MemoryStore;
    use crate::test_utils::{
        RecordingSink,
        sample_store,
    };
    use crate::value::ConditionSet;

    fn open() -> EditingSession {
        EditingSession::open(&sample_store(), "en", "ja").unwrap()
    }

    #[googletest::test]
    fn test_compute_changes_empty_for_untouched_session() {
        let session = open();

        expect_that!(compute_changes(&session), is_empty());
    }

    #[googletest::test]
    fn test_compute_changes_empty_when_edits_restore_values() {
        let mut session = open();
        let items = session.entry("items").unwrap().original().clone();

        session.set_current("common.hello", TranslationValue::from("こんにちは")).unwrap();
        session.set_current("items", items).unwrap();

        expect_that!(compute_changes(&session), is_empty());
    }

    #[googletest::test]
    fn test_compute_changes_only_includes_changed_entries() {
        let mut session = open();
        session.set_current("common.bye", TranslationValue::from("さようなら")).unwrap();

        let changes = compute_changes(&session);

        expect_that!(changes.len(), eq(1));
        expect_that!(changes.get("common.bye"), some(eq(&TranslationValue::from("さようなら"))));
    }

    #[googletest::test]
    fn test_compute_changes_variant_change_counts() {
        let store = MemoryStore::new().with_language("en", [("greeting", json!("Hello"))]);
        let mut session = EditingSession::open(&store, "ja", "en").unwrap();
        let conditional =
            TranslationValue::ConditionSet(ConditionSet::with_fallback("count", "Hello"));

        session.set_current("greeting", conditional.clone()).unwrap();

        let changes = compute_changes(&session);
        expect_that!(changes.get("greeting"), some(eq(&conditional)));
    }

    #[googletest::test]
    fn test_save_without_changes_skips_sink() {
        let session = open();
        let mut sink = RecordingSink::default();

        let outcome = tokio_test::block_on(session.save(&mut sink)).unwrap();

        expect_that!(outcome, eq(&SaveOutcome::NoChanges));
        expect_that!(sink.calls, is_empty());
    }

    #[googletest::test]
    fn test_save_persists_change_set_once() {
        let mut session = open();
        session.set_current("common.hello", TranslationValue::from("やあ")).unwrap();
        session.convert_to_conditional("common.bye", "name").unwrap();
        session.set_current("common.bye", TranslationValue::from("またね")).unwrap();
        let expected = compute_changes(&session);

        let mut sink = RecordingSink::default();
        let outcome = tokio_test::block_on(session.save(&mut sink)).unwrap();

        expect_that!(outcome, eq(&SaveOutcome::Saved { language: "ja".to_string(), count: 2 }));
        expect_that!(sink.calls.len(), eq(1));
        let (language, changes) = &sink.calls[0];
        expect_that!(language, eq("ja"));
        expect_that!(changes, eq(&expected));
    }

    #[googletest::test]
    fn test_save_rejects_invalid_condition_set() {
        let mut session = open();
        let entry = session.entry_mut("items").unwrap();
        entry.current_mut().as_condition_set_mut().unwrap().set_condition_value("0", " ");
        let mut sink = RecordingSink::default();

        let failure = tokio_test::block_on(session.save(&mut sink)).unwrap_err();

        match &failure.error {
            SaveError::Invalid { key, source } => {
                expect_that!(key, eq("items"));
                expect_that!(source, eq(&ConditionError::EmptyValue("0".to_string())));
            }
            SaveError::Persist(e) => panic!("unexpected persist error: {e}"),
        }
        expect_that!(sink.calls, is_empty());
        expect_that!(failure.session.changed_keys(), elements_are![eq(&"items")]);
    }

    #[googletest::test]
    fn test_save_ignores_unchanged_invalid_values() {
        let store = MemoryStore::new().with_language(
            "ja",
            [("broken", json!({ "param": "", "conditions": { "_": "x" } }))],
        );
        let session = EditingSession::open(&store, "en", "ja").unwrap();
        let mut sink = RecordingSink::default();

        let outcome = tokio_test::block_on(session.save(&mut sink)).unwrap();

        expect_that!(outcome, eq(&SaveOutcome::NoChanges));
    }

    #[googletest::test]
    fn test_save_passes_sink_error_through() {
        let mut session = open();
        session.set_current("common.hello", TranslationValue::from("やあ")).unwrap();
        let mut sink = RecordingSink::failing("disk full");

        let failure = tokio_test::block_on(session.save(&mut sink)).unwrap_err();

        expect_that!(sink.calls.len(), eq(1));
        match &failure.error {
            SaveError::Persist(e) => {
                expect_that!(e.to_string(), eq("disk full"));
            }
            SaveError::Invalid { .. } => panic!("unexpected validation error"),
        }
        // Edits survive, so saving again is a plain retry.
        let retry = failure.session;
        expect_that!(retry.changed_keys(), elements_are![eq(&"common.hello")]);

        let mut sink = RecordingSink::default();
        let outcome = tokio_test::block_on(retry.save(&mut sink)).unwrap();
        expect_that!(outcome, eq(&SaveOutcome::Saved { language: "ja".to_string(), count: 1 }));
    }

    #[tokio::test]
    async fn test_save_into_memory_store() {
        let mut store = sample_store();
        let mut session = EditingSession::open(&store, "en", "ja").unwrap();
        session.set_current("common.bye", TranslationValue::from("さようなら")).unwrap();

        let outcome = session.save(&mut store).await.unwrap();

        assert_eq!(outcome, SaveOutcome::Saved { language: "ja".to_string(), count: 1 });
        assert_eq!(store.get("ja", "common.bye"), Some(&json!("さようなら")));
        assert_eq!(store.get("ja", "common.hello"), Some(&json!("こんにちは")));
    }
}
