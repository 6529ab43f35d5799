//! UseCase: 保存件数の上限を超えた古いメッセージの削除（Retention Sweeper）
//!
//! メッセージが受理されるたびに起動され、タイマーでは動きません。
//! 複数の sweep が同時に走っても、既に削除済みの ID の削除は何もしないため安全です。
//! 書き込みが集中している間は一時的に上限を超えることがあります。

use std::sync::Arc;

use crate::domain::{MessageRepository, RepositoryError, select_expired};

/// Retention Sweeper のユースケース
pub struct SweepMessagesUseCase {
    repository: Arc<dyn MessageRepository>,
    /// 保存しておく最新メッセージの件数
    retention_limit: usize,
}

impl SweepMessagesUseCase {
    pub fn new(repository: Arc<dyn MessageRepository>, retention_limit: usize) -> Self {
        Self {
            repository,
            retention_limit,
        }
    }

    /// 1 回分の sweep を実行し、削除した件数を返す
    pub async fn execute(&self) -> Result<usize, RepositoryError> {
        let messages = self.repository.list_ascending().await?;
        let expired = select_expired(&messages, self.retention_limit);
        if expired.is_empty() {
            return Ok(0);
        }

        let deleted = self.repository.delete_batch(&expired).await?;
        tracing::debug!(
            "Swept {} expired message(s) (limit {})",
            deleted,
            self.retention_limit
        );
        Ok(deleted)
    }

    /// バックグラウンドで sweep を起動する（完了を待たない）
    ///
    /// 失敗はログに出力するだけで、呼び出し側には伝えない。
    pub fn trigger(self: &Arc<Self>) {
        let sweeper = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = sweeper.execute().await {
                tracing::error!("Retention sweep failed: {}", e);
            }
        });
    }
}
