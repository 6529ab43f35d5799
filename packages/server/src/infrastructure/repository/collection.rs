//! 順序付きメッセージコレクション
//!
//! ストア実装が共有する中核部分です。ロックや永続化は持たず、呼び出し側
//! （各 Repository）が排他制御を行います。

use std::collections::HashSet;

use crate::domain::{Message, MessageContent, MessageId, Nickname, Timestamp};

/// `timestamp` 昇順に並んだメッセージの集合
///
/// ## 不変条件
///
/// - `messages` は常に `timestamp` の昇順
/// - 新しく付与される `timestamp` は既存の全ての値より大きい
#[derive(Debug, Clone)]
pub struct MessageCollection {
    messages: Vec<Message>,
    last_timestamp: i64,
}

impl Default for MessageCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageCollection {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            last_timestamp: i64::MIN,
        }
    }

    /// 既存のメッセージからコレクションを復元する（順不同で渡してよい）
    pub fn from_messages(mut messages: Vec<Message>) -> Self {
        messages.sort_by_key(|message| message.timestamp);
        let last_timestamp = messages
            .last()
            .map(|message| message.timestamp.value())
            .unwrap_or(i64::MIN);
        Self {
            messages,
            last_timestamp,
        }
    }

    /// メッセージを追加し、採番済みの Message を返す
    ///
    /// `now` が直前の値以下の場合（時計の巻き戻りや同一マイクロ秒内の連続書き込み）は
    /// 直前の値 + 1µs を使う。
    pub fn insert(&mut self, nickname: Nickname, content: MessageContent, now: i64) -> Message {
        let timestamp = now.max(self.last_timestamp.saturating_add(1));
        self.last_timestamp = timestamp;

        let message = Message::new(
            MessageId::generate(),
            nickname,
            content,
            Timestamp::new(timestamp),
        );
        self.messages.push(message.clone());
        message
    }

    /// 最新 `limit` 件（昇順）
    pub fn recent(&self, limit: usize) -> Vec<Message> {
        let start = self.messages.len().saturating_sub(limit);
        self.messages[start..].to_vec()
    }

    /// `timestamp > after` の先頭 `limit` 件（昇順）
    pub fn after(&self, after: Timestamp, limit: usize) -> Vec<Message> {
        let start = self
            .messages
            .partition_point(|message| message.timestamp <= after);
        self.messages[start..].iter().take(limit).cloned().collect()
    }

    /// 全件（昇順）
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// 指定 ID を一括削除し、実際に削除した件数を返す
    pub fn delete_batch(&mut self, ids: &[MessageId]) -> usize {
        if ids.is_empty() {
            return 0;
        }
        let targets: HashSet<&MessageId> = ids.iter().collect();
        let before = self.messages.len();
        self.messages.retain(|message| !targets.contains(&message.id));
        before - self.messages.len()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
