//! i18n-editor
//!
//! 翻訳エディタのデータ層。条件付き翻訳値、編集セッション、保存時の差分検出を提供する。

pub mod condition;
pub mod config;
pub mod diff;
pub mod session;
pub mod store;
pub mod value;

#[cfg(test)]
mod test_utils;

pub use condition::ConditionError;
pub use diff::{
    ChangeSet,
    SaveError,
    SaveFailure,
    SaveOutcome,
    compute_changes,
};
pub use session::{
    EditableEntry,
    EditingSession,
    SessionError,
};
pub use store::{
    MemoryStore,
    TranslationSink,
    TranslationStore,
};
pub use value::{
    ConditionKey,
    ConditionSet,
    TranslationValue,
    ValueError,
    describe_for_search,
    is_equivalent,
    sort_condition_keys,
};
