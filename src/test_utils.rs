//! テスト用ユーティリティ関数
//!
//! 複数のテストモジュールで使用される共通のストアとシンクを提供します。

use serde_json::json;
use thiserror::Error;

use crate::diff::ChangeSet;
use crate::store::{
    MemoryStore,
    TranslationSink,
};

/// テスト用のストアを作成する
///
/// - `en`: `common.hello`, `common.bye`, `items`（条件付き）
/// - `ja`: `common.hello`, `items`（条件付き）, `ja.only`
pub(crate) fn sample_store() -> MemoryStore {
    MemoryStore::new()
        .with_language(
            "en",
            [
                ("common.hello", json!("Hello")),
                ("common.bye", json!("Goodbye")),
                (
                    "items",
                    json!({
                        "param": "count",
                        "conditions": { "1": "One item", "_": "{count} items" }
                    }),
                ),
            ],
        )
        .with_language(
            "ja",
            [
                ("common.hello", json!("こんにちは")),
                (
                    "items",
                    json!({
                        "param": "count",
                        "conditions": { "0": "なし", "_": "{count} 個" }
                    }),
                ),
                ("ja.only", json!("のみ")),
            ],
        )
}

/// シンクが返すエラー
#[derive(Error, Debug)]
#[error("{0}")]
pub(crate) struct SinkError(String);

/// 呼び出しを記録するシンク
#[derive(Debug, Default)]
pub(crate) struct RecordingSink {
    /// 受け取った (言語, 変更) の履歴
    pub(crate) calls: Vec<(String, ChangeSet)>,
    /// 設定されている場合、記録後にこのメッセージで失敗する
    failure: Option<String>,
}

impl RecordingSink {
    /// 常に失敗するシンクを作成する
    pub(crate) fn failing(message: &str) -> Self {
        Self { calls: Vec::new(), failure: Some(message.to_string()) }
    }
}

impl TranslationSink for RecordingSink {
    type Error = SinkError;

    async fn persist(&mut self, language: &str, changes: ChangeSet) -> Result<(), Self::Error> {
        self.calls.push((language.to_string(), changes));
        self.failure.clone().map_or(Ok(()), |message| Err(SinkError(message)))
    }
}
