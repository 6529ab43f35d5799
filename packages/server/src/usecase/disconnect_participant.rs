//! UseCase: 参加者切断処理

use std::sync::Arc;

use crate::domain::{ConnectionId, MessagePusher};

/// 参加者切断のユースケース
pub struct DisconnectParticipantUseCase {
    /// MessagePusher（接続の登録先）
    message_pusher: Arc<dyn MessagePusher>,
}

impl DisconnectParticipantUseCase {
    /// 新しい DisconnectParticipantUseCase を作成
    pub fn new(message_pusher: Arc<dyn MessagePusher>) -> Self {
        Self { message_pusher }
    }

    /// 参加者切断を実行し、残りの接続数を返す
    ///
    /// 既に登録解除済みの接続に対しても安全に呼び出せる。
    pub async fn execute(&self, connection_id: &ConnectionId) -> usize {
        self.message_pusher.unregister_client(connection_id).await;
        self.message_pusher.count_connections().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{domain::Nickname, infrastructure::message_pusher::WebSocketMessagePusher};

    #[tokio::test]
    async fn test_disconnect_participant() {
        // テスト項目: 切断した接続だけが登録解除され、残りの接続数が返る
        // given (前提条件):
        let message_pusher = Arc::new(WebSocketMessagePusher::new());
        let usecase = DisconnectParticipantUseCase::new(message_pusher.clone());
        let alice = ConnectionId::generate();
        let (tx1, _rx1) = tokio::sync::mpsc::unbounded_channel();
        let (tx2, _rx2) = tokio::sync::mpsc::unbounded_channel();
        message_pusher
            .register_client(alice, Nickname::new("alice".to_string()).unwrap(), tx1)
            .await;
        message_pusher
            .register_client(
                ConnectionId::generate(),
                Nickname::new("bob".to_string()).unwrap(),
                tx2,
            )
            .await;

        // when (操作):
        let remaining = usecase.execute(&alice).await;

        // then (期待する結果):
        assert_eq!(remaining, 1);
    }

    #[tokio::test]
    async fn test_disconnect_unknown_connection() {
        // テスト項目: 登録されていない接続の切断はエラーにならない
        // given (前提条件):
        let message_pusher = Arc::new(WebSocketMessagePusher::new());
        let usecase = DisconnectParticipantUseCase::new(message_pusher);

        // when (操作):
        let remaining = usecase.execute(&ConnectionId::generate()).await;

        // then (期待する結果):
        assert_eq!(remaining, 0);
    }
}
