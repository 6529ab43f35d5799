//! InMemory Message Repository 実装
//!
//! ドメイン層が定義する MessageRepository trait の具体的な実装。
//! プロセス内の `MessageCollection` をドキュメントストアとして使用します。
//! プロセスを再起動すると履歴は失われます。

use std::sync::Arc;

use async_trait::async_trait;
use sokdo_shared::time::Clock;
use tokio::sync::Mutex;

use crate::domain::{
    Message, MessageContent, MessageId, MessageRepository, Nickname, RepositoryError, Timestamp,
};
use crate::infrastructure::repository::collection::MessageCollection;

/// インメモリ Message Repository 実装
pub struct InMemoryMessageRepository {
    /// 保存中のメッセージ
    collection: Mutex<MessageCollection>,
    /// タイムスタンプ採番用の時計
    clock: Arc<dyn Clock>,
}

impl InMemoryMessageRepository {
    /// 新しい InMemoryMessageRepository を作成
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            collection: Mutex::new(MessageCollection::new()),
            clock,
        }
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn append(
        &self,
        nickname: Nickname,
        content: MessageContent,
    ) -> Result<Message, RepositoryError> {
        let mut collection = self.collection.lock().await;
        Ok(collection.insert(nickname, content, self.clock.now_utc_micros()))
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
        Ok(collection.delete_batch(ids))
    }

    async fn count(&self) -> Result<usize, RepositoryError> {
        let collection = self.collection.lock().await;
        Ok(collection.len())
    }
}
