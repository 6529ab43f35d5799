//! JSON ファイル Message Repository 実装
//!
//! メッセージコレクション全体を 1 つの JSON ドキュメントとして保存します。
//! 書き込みは一時ファイルへの出力と rename で行うため、ファイルは常に
//! 変更前か変更後のどちらかの完全な状態になります。
//!
//! 保存形式（DB 表現）とドメインモデルは `StoredMessage` で分離しています。
//!
//! ```text
//! JSON ファイル → StoredMessage → Message（ドメインモデル）
//! ```

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sokdo_shared::time::Clock;
use tokio::sync::Mutex;

use crate::domain::{
    Message, MessageContent, MessageId, MessageRepository, Nickname, RepositoryError, Timestamp,
};
use crate::infrastructure::repository::collection::MessageCollection;

/// ファイル上の 1 レコード
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredMessage {
    id: String,
    nickname: String,
    content: String,
    /// UTC マイクロ秒
    timestamp: i64,
}

impl From<&Message> for StoredMessage {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id.as_str().to_string(),
            nickname: message.nickname.as_str().to_string(),
            content: message.content.as_str().to_string(),
            timestamp: message.timestamp.value(),
        }
    }
}

impl TryFrom<StoredMessage> for Message {
    type Error = RepositoryError;

    fn try_from(record: StoredMessage) -> Result<Self, Self::Error> {
        let corrupted = |e: crate::domain::ValueObjectError| {
            RepositoryError::Corrupted(format!("record '{}': {}", record.id, e))
        };
        Ok(Message::new(
            MessageId::new(record.id.clone()).map_err(corrupted)?,
            Nickname::new(record.nickname.clone()).map_err(corrupted)?,
            MessageContent::new(record.content.clone()).map_err(corrupted)?,
            Timestamp::new(record.timestamp),
        ))
    }
}

/// JSON ファイルを使った Message Repository 実装
pub struct JsonFileMessageRepository {
    /// 保存先ファイル
    path: PathBuf,
    /// ファイル内容のメモリ上のコピー（書き込み成功後にのみ更新される）
    collection: Mutex<MessageCollection>,
    /// タイムスタンプ採番用の時計
    clock: Arc<dyn Clock>,
}

impl JsonFileMessageRepository {
    /// ファイルを開いて Repository を作成（ファイルが無ければ空で開始）
    pub async fn open(
        path: impl Into<PathBuf>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, RepositoryError> {
        let path = path.into();
        let collection = load(&path).await?;
        tracing::info!(
            "Opened message store at {} ({} messages)",
            path.display(),
            collection.len()
        );

        Ok(Self {
            path,
            collection: Mutex::new(collection),
            clock,
        })
    }

    /// コレクション全体をファイルに書き出す
    async fn persist(&self, collection: &MessageCollection) -> Result<(), RepositoryError> {
        let records: Vec<StoredMessage> =
            collection.messages().iter().map(StoredMessage::from).collect();
        let json = serde_json::to_vec_pretty(&records)
            .map_err(|e| RepositoryError::Storage(e.to_string()))?;

        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, json)
            .await
            .map_err(|e| RepositoryError::Storage(format!("{}: {}", tmp_path.display(), e)))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| RepositoryError::Storage(format!("{}: {}", self.path.display(), e)))?;

        Ok(())
    }
}

/// ファイルからコレクションを読み込む
async fn load(path: &Path) -> Result<MessageCollection, RepositoryError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(MessageCollection::new()),
        Err(e) => {
            return Err(RepositoryError::Storage(format!(
                "{}: {}",
                path.display(),
                e
            )));
        }
    };

    let records: Vec<StoredMessage> = serde_json::from_slice(&bytes)
        .map_err(|e| RepositoryError::Corrupted(format!("{}: {}", path.display(), e)))?;
    let messages = records
        .into_iter()
        .map(Message::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(MessageCollection::from_messages(messages))
}

#[async_trait]
impl MessageRepository for JsonFileMessageRepository {
    async fn append(
        &self,
        nickname: Nickname,
        content: MessageContent,
    ) -> Result<Message, RepositoryError> {
        let mut collection = self.collection.lock().await;

        let mut next = collection.clone();
        let message = next.insert(nickname, content, self.clock.now_utc_micros());
        self.persist(&next).await?;
        *collection = next;

        Ok(message)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<Message>, RepositoryError> {
        let collection = self.collection.lock().await;
        Ok(collection.recent(limit))
    }

    async fn after(&self, after: Timestamp, limit: usize) -> Result<Vec<Message>, RepositoryError> {
        let collection = self.collection.lock().await;
        Ok(collection.after(after, limit))
    }

    async fn list_ascending(&self) -> Result<Vec<Message>, RepositoryError> {
        let collection = self.collection.lock().await;
        Ok(collection.messages().to_vec())
    }

    async fn delete_batch(&self, ids: &[MessageId]) -> Result<usize, RepositoryError> {
        let mut collection = self.collection.lock().await;

        let mut next = collection.clone();
        let deleted = next.delete_batch(ids);
        if deleted == 0 {
            return Ok(0);
        }
        self.persist(&next).await?;
        *collection = next;

        Ok(deleted)
    }

    async fn count(&self) -> Result<usize, RepositoryError> {
        let collection = self.collection.lock().await;
        Ok(collection.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sokdo_shared::time::SystemClock;

    fn nickname(value: &str) -> Nickname {
        Nickname::new(value.to_string()).unwrap()
    }

    fn content(value: &str) -> MessageContent {
        MessageContent::new(value.to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_open_missing_file_starts_empty() {
        // テスト項目: ファイルが存在しない場合は空のストアとして開ける
        // given (前提条件):
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("messages.json");

        // when (操作):
        let repo = JsonFileMessageRepository::open(&path, Arc::new(SystemClock))
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(repo.count().await.unwrap(), 0);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_messages_survive_reopen() {
        // テスト項目: 追記したメッセージは再オープン後も同じ順序・ID で読み出せる
        // given (前提条件):
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("messages.json");
        let repo = JsonFileMessageRepository::open(&path, Arc::new(SystemClock))
            .await
            .unwrap();
        let first = repo.append(nickname("alice"), content("one")).await.unwrap();
        let second = repo.append(nickname("bob"), content("two")).await.unwrap();
        drop(repo);

        // when (操作):
        let reopened = JsonFileMessageRepository::open(&path, Arc::new(SystemClock))
            .await
            .unwrap();

        // then (期待する結果):
        let messages = reopened.list_ascending().await.unwrap();
        assert_eq!(messages, vec![first, second]);
    }

    #[tokio::test]
    async fn test_delete_batch_is_persisted() {
        // テスト項目: 一括削除の結果がファイルに反映される
        // given (前提条件):
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("messages.json");
        let repo = JsonFileMessageRepository::open(&path, Arc::new(SystemClock))
            .await
            .unwrap();
        let old = repo.append(nickname("alice"), content("old")).await.unwrap();
        let new = repo.append(nickname("alice"), content("new")).await.unwrap();

        // when (操作):
        let deleted = repo.delete_batch(&[old.id]).await.unwrap();

        // then (期待する結果):
        assert_eq!(deleted, 1);
        let reopened = JsonFileMessageRepository::open(&path, Arc::new(SystemClock))
            .await
            .unwrap();
        assert_eq!(reopened.list_ascending().await.unwrap(), vec![new]);
    }

    #[tokio::test]
    async fn test_open_corrupted_file_fails() {
        // テスト項目: 壊れたファイルを開くと Corrupted エラーになる
        // given (前提条件):
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("messages.json");
        std::fs::write(&path, b"not json").unwrap();

        // when (操作):
        let result = JsonFileMessageRepository::open(&path, Arc::new(SystemClock)).await;

        // then (期待する結果):
        assert!(matches!(result, Err(RepositoryError::Corrupted(_))));
    }

    #[tokio::test]
    async fn test_append_failure_leaves_store_unchanged() {
        // テスト項目: 書き込みに失敗した場合、メモリ上の状態も変更されない
        // given (前提条件):
        let dir = tempfile::tempdir().unwrap();
        let store_dir = dir.path().join("store");
        std::fs::create_dir(&store_dir).unwrap();
        let path = store_dir.join("messages.json");
        let repo = JsonFileMessageRepository::open(&path, Arc::new(SystemClock))
            .await
            .unwrap();
        std::fs::remove_dir(&store_dir).unwrap();

        // when (操作):
        let result = repo.append(nickname("alice"), content("lost")).await;

        // then (期待する結果):
        assert!(matches!(result, Err(RepositoryError::Storage(_))));
        assert_eq!(repo.count().await.unwrap(), 0);
    }
}
