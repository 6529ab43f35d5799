//! UseCase: メッセージ送信処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - SendMessageUseCase::execute()（WebSocket セッション経由）
//! - SendMessageUseCase::execute_http()（HTTP フォールバック経由）
//!
//! ### なぜこのテストが必要か
//! - 受理されたメッセージだけが保存・配信されることを保証する
//! - 他人のニックネームを名乗ったメッセージは保存も配信もされてはならない
//! - ストア障害時に何も配信されないことを確認する
//!
//! ### どのような状況を想定しているか
//! - 正常系：保存されたメッセージが送信者を含む全接続に届く
//! - 異常系：フィールド欠落、なりすまし、許可リスト外、ストア障害
//! - エッジケース：受理後に sweep が走り、上限を超えた古いメッセージが消える

use std::sync::Arc;

use crate::domain::{
    AccessPolicy, Message, MessageContent, MessagePusher, MessageRepository, Nickname,
};

use super::{error::SendMessageError, sweep_messages::SweepMessagesUseCase};

/// メッセージ送信のユースケース
pub struct SendMessageUseCase {
    /// Repository（データアクセス層の抽象化）
    repository: Arc<dyn MessageRepository>,
    /// MessagePusher（メッセージ通知の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
    policy: Arc<AccessPolicy>,
    sweeper: Arc<SweepMessagesUseCase>,
}

impl SendMessageUseCase {
    /// 新しい SendMessageUseCase を作成
    pub fn new(
        repository: Arc<dyn MessageRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        policy: Arc<AccessPolicy>,
        sweeper: Arc<SweepMessagesUseCase>,
    ) -> Self {
        Self {
            repository,
            message_pusher,
            policy,
            sweeper,
        }
    }

    /// セッション中の接続から届いたメッセージを処理する
    ///
    /// 接続時に許可リストを通過しているため、ここではニックネームの一致だけを確認する。
    ///
    /// # Arguments
    ///
    /// * `session_nickname` - ハンドシェイク時のニックネーム
    /// * `nickname` / `content` - 受信したペイロードのフィールド
    ///
    /// # Returns
    ///
    /// * `Ok(Message)` - 保存・配信済みのメッセージ
    /// * `Err(SendMessageError)` - 保存も配信もされていない
    pub async fn execute(
        &self,
        session_nickname: &Nickname,
        nickname: Option<String>,
        content: Option<String>,
    ) -> Result<Message, SendMessageError> {
        let (nickname, content) = validate(nickname, content)?;

        if nickname != *session_nickname {
            tracing::warn!(
                "Nickname mismatch: connection '{}' sent a message as '{}'",
                session_nickname.as_str(),
                nickname.as_str()
            );
            return Err(SendMessageError::NicknameMismatch {
                expected: session_nickname.as_str().to_string(),
                actual: nickname.into_string(),
            });
        }

        self.accept(nickname, content).await
    }

    /// HTTP フォールバック（`POST /send`）から届いたメッセージを処理する
    ///
    /// 接続を持たないため、許可リストをここで確認する。
    pub async fn execute_http(
        &self,
        nickname: String,
        content: String,
    ) -> Result<Message, SendMessageError> {
        if !self.policy.allowed(&nickname) {
            tracing::warn!("Rejected message from forbidden nickname '{}'", nickname);
            return Err(SendMessageError::Forbidden(nickname));
        }

        let (nickname, content) = validate(Some(nickname), Some(content))?;
        self.accept(nickname, content).await
    }

    /// 保存 → 配信 → sweep の起動
    async fn accept(
        &self,
        nickname: Nickname,
        content: MessageContent,
    ) -> Result<Message, SendMessageError> {
        // 1. Repository 経由で保存（id と timestamp はストアが採番する）
        let message = self
            .repository
            .append(nickname, content)
            .await
            .map_err(|e| {
                tracing::error!("Failed to store message: {}", e);
                SendMessageError::Storage(e)
            })?;

        // 2. 送信者を含む全接続へ配信
        self.message_pusher.broadcast(&message).await;

        // 3. 保存件数の上限を超えていれば古いものを削除（完了を待たない）
        self.sweeper.trigger();

        Ok(message)
    }
}

/// ペイロードのフィールドを値オブジェクトに変換する
fn validate(
    nickname: Option<String>,
    content: Option<String>,
) -> Result<(Nickname, MessageContent), SendMessageError> {
    let nickname = nickname
        .and_then(|value| Nickname::new(value).ok())
        .ok_or(SendMessageError::InvalidFormat)?;
    let content = content
        .and_then(|value| MessageContent::new(value).ok())
        .ok_or(SendMessageError::InvalidFormat)?;
    Ok((nickname, content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{ConnectionId, MockMessageRepository, RepositoryError},
        infrastructure::{
            message_pusher::WebSocketMessagePusher, repository::InMemoryMessageRepository,
        },
    };
    use sokdo_shared::time::SystemClock;
    use std::time::Duration;
    use tokio::sync::mpsc;

    struct TestContext {
        usecase: SendMessageUseCase,
        repository: Arc<dyn MessageRepository>,
        message_pusher: Arc<WebSocketMessagePusher>,
    }

    fn create_test_context_with(
        repository: Arc<dyn MessageRepository>,
        policy: AccessPolicy,
        retention_limit: usize,
    ) -> TestContext {
        let message_pusher = Arc::new(WebSocketMessagePusher::new());
        let sweeper = Arc::new(SweepMessagesUseCase::new(
            repository.clone(),
            retention_limit,
        ));
        let usecase = SendMessageUseCase::new(
            repository.clone(),
            message_pusher.clone(),
            Arc::new(policy),
            sweeper,
        );
        TestContext {
            usecase,
            repository,
            message_pusher,
        }
    }

    fn create_test_context() -> TestContext {
        create_test_context_with(
            Arc::new(InMemoryMessageRepository::new(Arc::new(SystemClock))),
            AccessPolicy::allow_all(),
            50,
        )
    }

    async fn connect(
        context: &TestContext,
        nickname: &str,
    ) -> mpsc::UnboundedReceiver<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        context
            .message_pusher
            .register_client(
                ConnectionId::generate(),
                Nickname::new(nickname.to_string()).unwrap(),
                tx,
            )
            .await;
        rx
    }

    fn nickname(value: &str) -> Nickname {
        Nickname::new(value.to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_send_message_broadcasts_to_everyone() {
        // テスト項目: 受理されたメッセージは保存され、送信者を含む全接続に届く
        // given (前提条件):
        let context = create_test_context();
        let mut alice_rx = connect(&context, "alice").await;
        let mut bob_rx = connect(&context, "bob").await;

        // when (操作):
        let result = context
            .usecase
            .execute(
                &nickname("alice"),
                Some("alice".to_string()),
                Some("Hello".to_string()),
            )
            .await;

        // then (期待する結果):
        let message = result.unwrap();
        assert_eq!(context.repository.count().await.unwrap(), 1);
        for rx in [&mut alice_rx, &mut bob_rx] {
            let payload = rx.recv().await.unwrap();
            assert!(payload.contains(message.id.as_str()));
            assert!(payload.contains("Hello"));
        }
    }

    #[tokio::test]
    async fn test_send_message_missing_content() {
        // テスト項目: content が無いメッセージは InvalidFormat で、保存も配信もされない
        // given (前提条件):
        let context = create_test_context();
        let mut rx = connect(&context, "alice").await;

        // when (操作):
        let result = context
            .usecase
            .execute(&nickname("alice"), Some("alice".to_string()), None)
            .await;

        // then (期待する結果):
        assert_eq!(result, Err(SendMessageError::InvalidFormat));
        assert_eq!(context.repository.count().await.unwrap(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_send_message_empty_content() {
        // テスト項目: 空文字列の content も InvalidFormat になる
        // given (前提条件):
        let context = create_test_context();

        // when (操作):
        let result = context
            .usecase
            .execute(
                &nickname("alice"),
                Some("alice".to_string()),
                Some(String::new()),
            )
            .await;

        // then (期待する結果):
        assert_eq!(result, Err(SendMessageError::InvalidFormat));
    }

    #[tokio::test]
    async fn test_send_message_nickname_mismatch() {
        // テスト項目: alice の接続から bob を名乗ったメッセージは拒否され、保存も配信もされない
        // given (前提条件):
        let context = create_test_context();
        let mut rx = connect(&context, "bob").await;

        // when (操作):
        let result = context
            .usecase
            .execute(
                &nickname("alice"),
                Some("bob".to_string()),
                Some("I am bob".to_string()),
            )
            .await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(SendMessageError::NicknameMismatch {
                expected: "alice".to_string(),
                actual: "bob".to_string(),
            })
        );
        assert_eq!(context.repository.count().await.unwrap(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_send_message_storage_failure() {
        // テスト項目: 保存に失敗した場合は Storage エラーとなり、何も配信されない
        // given (前提条件):
        let mut repository = MockMessageRepository::new();
        repository
            .expect_append()
            .returning(|_, _| Err(RepositoryError::Storage("unavailable".to_string())));
        let context =
            create_test_context_with(Arc::new(repository), AccessPolicy::allow_all(), 50);
        let mut rx = connect(&context, "alice").await;

        // when (操作):
        let result = context
            .usecase
            .execute(
                &nickname("alice"),
                Some("alice".to_string()),
                Some("Hello".to_string()),
            )
            .await;

        // then (期待する結果):
        let error = result.unwrap_err();
        assert!(matches!(error, SendMessageError::Storage(_)));
        assert_eq!(error.to_string(), "failed to store message");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_send_message_http_forbidden() {
        // テスト項目: HTTP 経由の送信で許可リスト外のニックネームは Forbidden になる
        // given (前提条件):
        let context = create_test_context_with(
            Arc::new(InMemoryMessageRepository::new(Arc::new(SystemClock))),
            AccessPolicy::with_allow_list(["alice"]),
            50,
        );

        // when (操作):
        let result = context
            .usecase
            .execute_http("mallory".to_string(), "hi".to_string())
            .await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(SendMessageError::Forbidden("mallory".to_string()))
        );
        assert_eq!(context.repository.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_send_message_http_broadcasts() {
        // テスト項目: HTTP 経由の送信も保存され、接続中の全員に配信される
        // given (前提条件):
        let context = create_test_context();
        let mut rx = connect(&context, "bob").await;

        // when (操作):
        let result = context
            .usecase
            .execute_http("alice".to_string(), "via http".to_string())
            .await;

        // then (期待する結果):
        assert!(result.is_ok());
        let payload = rx.recv().await.unwrap();
        assert!(payload.contains("via http"));
    }

    #[tokio::test]
    async fn test_send_message_triggers_sweep() {
        // テスト項目: 上限を超えるメッセージを受理すると、バックグラウンドの sweep で古いものが消える
        // given (前提条件):
        let context = create_test_context_with(
            Arc::new(InMemoryMessageRepository::new(Arc::new(SystemClock))),
            AccessPolicy::allow_all(),
            3,
        );

        // when (操作):
        for i in 0..5 {
            context
                .usecase
                .execute_http("alice".to_string(), format!("m{}", i))
                .await
                .unwrap();
        }

        // then (期待する結果): sweep は非同期なので上限に収まるまで待つ
        let mut count = context.repository.count().await.unwrap();
        for _ in 0..50 {
            if count <= 3 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
            count = context.repository.count().await.unwrap();
        }
        assert_eq!(count, 3);
        let remaining = context.repository.list_ascending().await.unwrap();
        assert_eq!(remaining[0].content.as_str(), "m2");
    }
}
