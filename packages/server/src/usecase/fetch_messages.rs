//! UseCase: 履歴取得（History Retrieval）
//!
//! `after` が指定されていればそれより新しいメッセージを、無ければ（または解釈できなければ）
//! 最新のメッセージを返します。どちらも古い順です。

use std::sync::Arc;

use sokdo_shared::time::parse_timestamp;

use crate::domain::{AccessPolicy, DEFAULT_HISTORY_LIMIT, Message, MessageRepository, Timestamp};

use super::error::FetchMessagesError;

/// 履歴取得のユースケース
pub struct FetchMessagesUseCase {
    repository: Arc<dyn MessageRepository>,
    policy: Arc<AccessPolicy>,
}

impl FetchMessagesUseCase {
    pub fn new(repository: Arc<dyn MessageRepository>, policy: Arc<AccessPolicy>) -> Self {
        Self { repository, policy }
    }

    /// 履歴取得を実行（件数は既定値）
    ///
    /// # Arguments
    ///
    /// * `nickname` - 要求者のニックネーム。許可リストが設定されている場合は必須
    /// * `after` - この時刻より後のメッセージだけを返す（RFC 3339 または ISO-8601）
    pub async fn execute(
        &self,
        nickname: Option<&str>,
        after: Option<&str>,
    ) -> Result<Vec<Message>, FetchMessagesError> {
        self.execute_with_limit(nickname, after, DEFAULT_HISTORY_LIMIT)
            .await
    }

    pub async fn execute_with_limit(
        &self,
        nickname: Option<&str>,
        after: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Message>, FetchMessagesError> {
        let permitted = match nickname {
            Some(nickname) => self.policy.allowed(nickname),
            None => !self.policy.is_restricted(),
        };
        if !permitted {
            tracing::warn!("Rejected history request from {:?}", nickname);
            return Err(FetchMessagesError::Forbidden(nickname.map(str::to_string)));
        }

        let after = after.and_then(|value| {
            let parsed = parse_timestamp(value);
            if parsed.is_none() {
                tracing::debug!("Ignoring unparsable 'after' value: {:?}", value);
            }
            parsed
        });

        let result = match after {
            Some(after) => self.repository.after(Timestamp::new(after), limit).await,
            None => self.repository.recent(limit).await,
        };
        result.map_err(|e| {
            tracing::error!("Failed to load messages: {}", e);
            FetchMessagesError::Storage(e)
        })
    }
}
