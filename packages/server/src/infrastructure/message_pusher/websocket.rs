//! WebSocket を使った MessagePusher 実装
//!
//! ## 責務
//!
//! - 接続中のクライアントの `UnboundedSender` を `ConnectionId` ごとに管理
//! - クライアントへのメッセージ送信（push_to, broadcast）
//!
//! WebSocket の受付と sender の生成は UI 層（`ui/handler/websocket.rs`）で行われます。
//! この実装は受け取った sender を保持し、メッセージ送信にのみ使用します。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    ConnectionId, Message, MessagePushError, MessagePusher, Nickname, PusherChannel,
};
use crate::infrastructure::dto::websocket::{MessageDto, ServerEvent};

/// 登録中の 1 接続
struct ConnectionEntry {
    nickname: Nickname,
    sender: PusherChannel,
}

/// WebSocket を使った MessagePusher 実装
///
/// 接続の識別子はニックネームではなく `ConnectionId` なので、同じニックネームで
/// 複数の接続を持つことができます。
#[derive(Default)]
pub struct WebSocketMessagePusher {
    /// Key: 接続 ID, Value: ニックネームと送信チャンネル
    connections: Mutex<HashMap<ConnectionId, ConnectionEntry>>,
}

impl WebSocketMessagePusher {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登録中の接続のニックネーム一覧（順不同）
    #[cfg(test)]
    async fn nicknames(&self) -> Vec<Nickname> {
        let connections = self.connections.lock().await;
        connections
            .values()
            .map(|entry| entry.nickname.clone())
            .collect()
    }
}

#[async_trait]
impl MessagePusher for WebSocketMessagePusher {
    async fn register_client(
        &self,
        connection_id: ConnectionId,
        nickname: Nickname,
        sender: PusherChannel,
    ) {
        let mut connections = self.connections.lock().await;
        tracing::debug!(
            "Connection {} ('{}') registered to MessagePusher",
            connection_id,
            nickname.as_str()
        );
        connections.insert(connection_id, ConnectionEntry { nickname, sender });
    }

    async fn unregister_client(&self, connection_id: &ConnectionId) {
        let mut connections = self.connections.lock().await;
        if let Some(entry) = connections.remove(connection_id) {
            tracing::debug!(
                "Connection {} ('{}') unregistered from MessagePusher",
                connection_id,
                entry.nickname.as_str()
            );
        }
    }

    async fn push_to(
        &self,
        connection_id: &ConnectionId,
        content: &str,
    ) -> Result<(), MessagePushError> {
        let connections = self.connections.lock().await;

        let entry = connections
            .get(connection_id)
            .ok_or_else(|| MessagePushError::ClientNotFound(connection_id.to_string()))?;
        entry
            .sender
            .send(content.to_string())
            .map_err(|e| MessagePushError::PushFailed(e.to_string()))?;
        tracing::debug!("Pushed message to connection {}", connection_id);
        Ok(())
    }

    async fn broadcast(&self, message: &Message) {
        let payload = match serde_json::to_string(&ServerEvent::Message(MessageDto::from(message)))
        {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!("Failed to serialize message {}: {}", message.id.as_str(), e);
                return;
            }
        };

        // 送信中に登録・解除が起きても影響を受けないよう、ロック中にスナップショットを取る
        let targets: Vec<(ConnectionId, PusherChannel)> = {
            let connections = self.connections.lock().await;
            connections
                .iter()
                .map(|(id, entry)| (*id, entry.sender.clone()))
                .collect()
        };

        let mut failed = Vec::new();
        for (connection_id, sender) in targets {
            if let Err(e) = sender.send(payload.clone()) {
                tracing::warn!(
                    "Failed to push message to connection {}: {}",
                    connection_id,
                    e
                );
                failed.push(connection_id);
            }
        }

        if !failed.is_empty() {
            let mut connections = self.connections.lock().await;
            for connection_id in &failed {
                connections.remove(connection_id);
            }
            tracing::info!("Removed {} dead connection(s) after broadcast", failed.len());
        }
    }

    async fn count_connections(&self) -> usize {
        self.connections.lock().await.len()
    }
}
