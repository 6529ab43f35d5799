//! Repository trait 定義
//!
//! ドメイン層が必要とするメッセージストアへのインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。

use async_trait::async_trait;

use super::{Message, MessageContent, MessageId, Nickname, RepositoryError, Timestamp};

/// Message Repository trait（Persistence Gateway）
///
/// 外部のドキュメントストアをブラックボックスとして扱うための薄いインターフェース。
///
/// ## 順序
///
/// - `id` と `timestamp` は `append` 時にストア側が採番する
/// - 読み出し結果は常に `timestamp` の昇順（古いものが先頭）
/// - `timestamp` はストア内で単調増加し、同じ値が二度付与されることはない
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// メッセージを追記し、採番済みの Message を返す
    async fn append(
        &self,
        nickname: Nickname,
        content: MessageContent,
    ) -> Result<Message, RepositoryError>;

    /// 最新 `limit` 件を昇順で取得
    async fn recent(&self, limit: usize) -> Result<Vec<Message>, RepositoryError>;

    /// `timestamp > after` のメッセージを昇順で先頭から `limit` 件取得
    async fn after(&self, after: Timestamp, limit: usize) -> Result<Vec<Message>, RepositoryError>;

    /// 全メッセージを昇順で取得
    async fn list_ascending(&self) -> Result<Vec<Message>, RepositoryError>;

    /// 指定 ID のメッセージを一括削除し、実際に削除した件数を返す
    ///
    /// 既に存在しない ID は無視される（冪等）。
    async fn delete_batch(&self, ids: &[MessageId]) -> Result<usize, RepositoryError>;

    /// 保存されているメッセージ数
    async fn count(&self) -> Result<usize, RepositoryError>;
}
