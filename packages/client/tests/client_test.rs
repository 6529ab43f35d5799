//! Integration tests for the chat client against an in-process server.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use sokdo_client::{
    ChatClient, ClientError, Delivery, ListenerEvent, config::ServerEndpoint, timeline::Timeline,
};
use sokdo_server::{
    domain::{AccessPolicy, DEFAULT_RETENTION_LIMIT, MessageRepository},
    infrastructure::{
        dto::websocket::ChatMessageDto, message_pusher::WebSocketMessagePusher,
        repository::InMemoryMessageRepository,
    },
    ui::Server,
    usecase::{
        ConnectParticipantUseCase, DisconnectParticipantUseCase, FetchMessagesUseCase,
        SendMessageUseCase, SweepMessagesUseCase,
    },
};
use sokdo_shared::time::SystemClock;
use tokio::{sync::mpsc::UnboundedReceiver, task::JoinHandle};

const RECV_TIMEOUT: Duration = Duration::from_secs(3);

struct TestServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl TestServer {
    async fn start(policy: AccessPolicy) -> Self {
        let policy = Arc::new(policy);
        let repository: Arc<dyn MessageRepository> =
            Arc::new(InMemoryMessageRepository::new(Arc::new(SystemClock)));
        let message_pusher = Arc::new(WebSocketMessagePusher::new());
        let sweeper = Arc::new(SweepMessagesUseCase::new(
            repository.clone(),
            DEFAULT_RETENTION_LIMIT,
        ));

        let server = Server::new(
            Arc::new(ConnectParticipantUseCase::new(
                repository.clone(),
                message_pusher.clone(),
                policy.clone(),
            )),
            Arc::new(DisconnectParticipantUseCase::new(message_pusher.clone())),
            Arc::new(SendMessageUseCase::new(
                repository.clone(),
                message_pusher.clone(),
                policy.clone(),
                sweeper,
            )),
            Arc::new(FetchMessagesUseCase::new(repository, policy)),
            message_pusher,
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = server.into_router();
        let handle = tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        TestServer { addr, handle }
    }

    fn endpoint(&self) -> ServerEndpoint {
        ServerEndpoint::parse(&format!("http://{}", self.addr)).unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn next_event(events: &mut UnboundedReceiver<ListenerEvent>) -> ListenerEvent {
    tokio::time::timeout(RECV_TIMEOUT, events.recv())
        .await
        .expect("timed out waiting for a listener event")
        .expect("listener event channel closed")
}

/// Skip events until `Connected`
async fn wait_connected(events: &mut UnboundedReceiver<ListenerEvent>) {
    loop {
        if next_event(events).await == ListenerEvent::Connected {
            return;
        }
    }
}

#[tokio::test]
async fn test_login_and_send_over_websocket() {
    // テスト項目: ログイン後に送信したメッセージが WebSocket 経由で自分にも届く
    // given (前提条件):
    let server = TestServer::start(AccessPolicy::allow_all()).await;
    let mut client = ChatClient::new(server.endpoint());
    let mut events = client.login("alice").await.unwrap();
    wait_connected(&mut events).await;

    // when (操作):
    let delivery = client.send("hello").await.unwrap();

    // then (期待する結果):
    assert_eq!(delivery, Delivery::WebSocket);
    match next_event(&mut events).await {
        ListenerEvent::Message(message) => {
            assert_eq!(message.nickname, "alice");
            assert_eq!(message.content, "hello");
        }
        other => panic!("unexpected event: {:?}", other),
    }
    assert_eq!(client.nickname(), Some("alice"));

    client.logout().await;
}

#[tokio::test]
async fn test_history_is_rendered_once() {
    // テスト項目: 履歴 API とバックログの両方で届いたレコードは Timeline で 1 回だけ表示される
    // given (前提条件):
    let server = TestServer::start(AccessPolicy::allow_all()).await;
    let sender = ChatClient::new(server.endpoint());
    sender
        .send_http(&ChatMessageDto {
            nickname: "alice".to_string(),
            content: "earlier".to_string(),
        })
        .await
        .unwrap();

    // when (操作):
    let mut client = ChatClient::new(server.endpoint());
    let mut events = client.login("bob").await.unwrap();
    let mut timeline = Timeline::new();
    let mut rendered = Vec::new();
    let mut received = 0;
    while received < 2 {
        if let ListenerEvent::Message(message) = next_event(&mut events).await {
            received += 1;
            if timeline.admit(Some(&message.id)) {
                rendered.push(message.content);
            }
        }
    }

    // then (期待する結果):
    assert_eq!(rendered, vec!["earlier".to_string()]);

    client.logout().await;
}

#[tokio::test]
async fn test_forbidden_nickname_is_rejected() {
    // テスト項目: 許可リストに無いニックネームは Rejected となり、再接続しない
    // given (前提条件):
    let server = TestServer::start(AccessPolicy::with_allow_list(["alice"])).await;
    let mut client = ChatClient::new(server.endpoint());

    // when (操作):
    let mut events = client.login("mallory").await.unwrap();

    // then (期待する結果):
    assert_eq!(
        next_event(&mut events).await,
        ListenerEvent::Rejected(ClientError::ForbiddenNickname("mallory".to_string()))
    );
    let closed = tokio::time::timeout(RECV_TIMEOUT, events.recv()).await.unwrap();
    assert!(closed.is_none());

    client.logout().await;
}

#[tokio::test]
async fn test_send_falls_back_to_http() {
    // テスト項目: WebSocket が無いときは POST /send で送信され、拒否は ForbiddenNickname になる
    // given (前提条件):
    let server = TestServer::start(AccessPolicy::with_allow_list(["alice"])).await;
    let mut client = ChatClient::new(server.endpoint());
    let mut events = client.login("mallory").await.unwrap();
    assert!(matches!(
        next_event(&mut events).await,
        ListenerEvent::Rejected(_)
    ));

    // when (操作):
    let result = client.send("hi").await;

    // then (期待する結果):
    assert_eq!(
        result,
        Err(ClientError::ForbiddenNickname("mallory".to_string()))
    );

    // given (前提条件):
    let mut watcher = ChatClient::new(server.endpoint());
    let mut watcher_events = watcher.login("alice").await.unwrap();
    wait_connected(&mut watcher_events).await;
    let offline = ChatClient::new(server.endpoint());

    // when (操作):
    offline
        .send_http(&ChatMessageDto {
            nickname: "alice".to_string(),
            content: "from http".to_string(),
        })
        .await
        .unwrap();

    // then (期待する結果):
    match next_event(&mut watcher_events).await {
        ListenerEvent::Message(message) => assert_eq!(message.content, "from http"),
        other => panic!("unexpected event: {:?}", other),
    }

    watcher.logout().await;
}

#[tokio::test]
async fn test_send_requires_login() {
    // テスト項目: 未ログインでの送信はエラー、空白だけの入力は無視される
    // given (前提条件):
    let client = ChatClient::new(ServerEndpoint::default());

    // when (操作):
    let blank = client.send("   ").await;
    let anonymous = client.send("hello").await;

    // then (期待する結果):
    assert_eq!(blank, Ok(Delivery::Ignored));
    assert_eq!(anonymous, Err(ClientError::NotLoggedIn));
}

#[tokio::test]
async fn test_login_requires_nickname() {
    // テスト項目: 空のニックネームではログインできない
    // given (前提条件):
    let mut client = ChatClient::new(ServerEndpoint::default());

    // when (操作):
    let result = client.login("  ").await;

    // then (期待する結果):
    assert!(matches!(result, Err(ClientError::NicknameRequired)));
    assert_eq!(client.nickname(), None);
}

#[tokio::test]
async fn test_logout_cancels_reconnect_wait() {
    // テスト項目: 再接続待ちの間でもログアウトはすぐに完了する
    // given (前提条件):
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let endpoint = ServerEndpoint::parse(&format!("http://{}", addr)).unwrap();
    let mut client = ChatClient::new(endpoint).with_reconnect_delay(Duration::from_secs(60));
    let mut events = client.login("alice").await.unwrap();
    assert!(matches!(
        next_event(&mut events).await,
        ListenerEvent::Disconnected(_)
    ));

    // when (操作):
    let logout = tokio::time::timeout(Duration::from_secs(1), client.logout()).await;

    // then (期待する結果):
    assert!(logout.is_ok());
    assert!(!client.is_connected().await);
    assert_eq!(client.nickname(), None);

    // 2 回目のログアウトも問題なく終わる
    client.logout().await;
}
