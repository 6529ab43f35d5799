//! エンティティ

use super::value_object::{MessageContent, MessageId, Nickname, Timestamp};

/// チャットメッセージ
///
/// 永続化された時点で `id` と `timestamp` が確定し、以後変更されることはありません。
/// 削除されるのは Retention Sweeper による保持件数の調整時のみです。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub nickname: Nickname,
    pub content: MessageContent,
    pub timestamp: Timestamp,
}

impl Message {
    pub fn new(
        id: MessageId,
        nickname: Nickname,
        content: MessageContent,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            id,
            nickname,
            content,
            timestamp,
        }
    }
}
