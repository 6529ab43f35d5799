//! WebSocket connection handlers.
//!
//! 1 接続ごとに `ChatSession` を 1 つ作り、次の状態を順に遷移します。
//!
//! ```text
//! Connecting → Validating → Active → Closing → Closed
//!                  │
//!                  └─ ニックネーム無し (4000) / 許可リスト外 (4003) → Closed
//! ```

use std::{collections::HashSet, sync::Arc};

use axum::{
    extract::{
        Query, State,
        rejection::QueryRejection,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
    },
    http::HeaderMap,
    response::IntoResponse,
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, SplitStream, StreamExt},
};
use percent_encoding::percent_decode_str;
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::{
    domain::{self, ConnectionId, Nickname, PusherChannel},
    infrastructure::dto::websocket::{ErrorDto, InboundChatMessage, MessageDto, ServerEvent},
    ui::state::AppState,
    usecase::{ConnectError, SendMessageError},
};

/// Handshake header carrying the (percent-encoded) nickname
pub const NICKNAME_HEADER: &str = "x-nickname";

/// Close code sent when the handshake carries no nickname
pub const CLOSE_NICKNAME_REQUIRED: u16 = 4000;
/// Close code sent when the nickname is not on the allow-list
pub const CLOSE_FORBIDDEN_NICKNAME: u16 = 4003;

const BINARY_NOT_SUPPORTED: &str = "binary frames are not supported";

/// Query parameters for WebSocket connection
#[derive(Debug, Default, Deserialize)]
pub struct ConnectQuery {
    pub nickname: Option<String>,
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    query: Result<Query<ConnectQuery>, QueryRejection>,
) -> impl IntoResponse {
    // 壊れたクエリ文字列はニックネーム無しとして扱う（ヘッダーが優先）
    let query_nickname = match query {
        Ok(Query(query)) => query.nickname,
        Err(e) => {
            tracing::debug!("Ignoring unparsable query string: {}", e);
            None
        }
    };
    let nickname = nickname_from_handshake(&headers, query_nickname);
    ws.on_upgrade(move |socket| ChatSession::new(state, nickname).run(socket))
}

/// Extract the nickname from the handshake.
///
/// The `x-nickname` header (percent-decoded) wins over the `nickname` query parameter.
/// Empty values count as absent.
fn nickname_from_handshake(headers: &HeaderMap, query: Option<String>) -> Option<String> {
    let from_header = headers
        .get(NICKNAME_HEADER)
        .and_then(|value| std::str::from_utf8(value.as_bytes()).ok())
        .and_then(|value| percent_decode_str(value).decode_utf8().ok())
        .map(|value| value.into_owned())
        .filter(|value| !value.is_empty());

    from_header.or(query.filter(|value| !value.is_empty()))
}

/// Lifecycle of one chat connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Validating,
    Active,
    Closing,
    Closed,
}

/// One WebSocket chat connection
pub struct ChatSession {
    app: Arc<AppState>,
    connection_id: ConnectionId,
    requested_nickname: Option<String>,
    state: SessionState,
}

impl ChatSession {
    pub fn new(app: Arc<AppState>, requested_nickname: Option<String>) -> Self {
        Self {
            app,
            connection_id: ConnectionId::generate(),
            requested_nickname,
            state: SessionState::Connecting,
        }
    }

    fn transition(&mut self, next: SessionState) {
        tracing::debug!(
            "Connection {}: {:?} -> {:?}",
            self.connection_id,
            self.state,
            next
        );
        self.state = next;
    }

    /// Drive the session until the connection is closed
    pub async fn run(mut self, socket: WebSocket) {
        let (mut sender, receiver) = socket.split();
        self.transition(SessionState::Validating);

        // Validating: ニックネームの確認と許可リストの適用、接続の登録
        let (tx, rx) = mpsc::unbounded_channel();
        let participant = match self
            .app
            .connect_participant_usecase
            .execute(
                self.connection_id,
                self.requested_nickname.take(),
                tx.clone(),
            )
            .await
        {
            Ok(participant) => participant,
            Err(e) => {
                tracing::warn!("Rejecting connection {}: {:?}", self.connection_id, e);
                let frame = close_frame_for(&e);
                if let Err(e) = sender.send(Message::Close(Some(frame))).await {
                    tracing::debug!("Failed to send close frame: {}", e);
                }
                self.transition(SessionState::Closed);
                return;
            }
        };
        let nickname = participant.nickname;
        tracing::info!(
            "'{}' connected as {}",
            nickname.as_str(),
            self.connection_id
        );
        self.transition(SessionState::Active);

        // 履歴はこの接続にだけ、pusher_loop より先に書き出す
        // （その間に届いた broadcast はチャンネルに溜まり、履歴の後に送られる。
        //   履歴と重複するものは BacklogFilter が落とす）
        let mut backlog_sent = true;
        for message in &participant.backlog {
            let Some(payload) = encode_event(&ServerEvent::Message(MessageDto::from(message)))
            else {
                continue;
            };
            if let Err(e) = sender.send(Message::Text(payload.into())).await {
                tracing::warn!("Failed to send backlog to '{}': {}", nickname.as_str(), e);
                backlog_sent = false;
                break;
            }
        }
        if backlog_sent {
            tracing::debug!(
                "Sent {} backlog message(s) to '{}'",
                participant.backlog.len(),
                nickname.as_str()
            );

            let filter = BacklogFilter::new(&participant.backlog);
            let mut send_task = pusher_loop(rx, sender, filter);
            let mut recv_task = tokio::spawn(receive_loop(
                receiver,
                self.app.clone(),
                nickname.clone(),
                tx,
            ));

            // どちらかのタスクが終わったら、もう一方も止める
            tokio::select! {
                _ = &mut recv_task => send_task.abort(),
                _ = &mut send_task => recv_task.abort(),
            };
        }

        // Closing: 登録解除はここで 1 回だけ行う
        self.transition(SessionState::Closing);
        let remaining = self
            .app
            .disconnect_participant_usecase
            .execute(&self.connection_id)
            .await;
        tracing::info!(
            "'{}' disconnected ({} connection(s) remaining)",
            nickname.as_str(),
            remaining
        );
        self.transition(SessionState::Closed);
    }
}

/// Close frame for a rejected handshake
fn close_frame_for(error: &ConnectError) -> CloseFrame {
    let code = match error {
        ConnectError::NicknameRequired => CLOSE_NICKNAME_REQUIRED,
        ConnectError::Forbidden(_) => CLOSE_FORBIDDEN_NICKNAME,
    };
    CloseFrame {
        code,
        reason: error.to_string().into(),
    }
}

fn encode_event(event: &ServerEvent) -> Option<String> {
    match serde_json::to_string(event) {
        Ok(payload) => Some(payload),
        Err(e) => {
            tracing::error!("Failed to serialize server event: {}", e);
            None
        }
    }
}

/// Send an in-band `{error}` event to this connection only
fn push_error(sender: &PusherChannel, error: &str) {
    if let Some(payload) = encode_event(&ServerEvent::Error(ErrorDto::new(error))) {
        // 失敗するのは writer が既に終了している場合だけ
        let _ = sender.send(payload);
    }
}

/// Ids of backlog records already written to this connection.
///
/// The connection is registered before the backlog is read, so a message
/// stored in between is both in the backlog and queued on the channel.
/// The queued copy is dropped; each id is dropped at most once.
struct BacklogFilter {
    ids: HashSet<String>,
}

impl BacklogFilter {
    fn new(backlog: &[domain::Message]) -> Self {
        Self {
            ids: backlog
                .iter()
                .map(|message| message.id.as_str().to_string())
                .collect(),
        }
    }

    /// Returns false for the queued copy of a backlog record
    fn admit(&mut self, payload: &str) -> bool {
        if self.ids.is_empty() {
            return true;
        }
        match serde_json::from_str::<ServerEvent>(payload) {
            Ok(ServerEvent::Message(message)) => !self.ids.remove(&message.id),
            _ => true,
        }
    }
}

/// Spawns a task that receives messages from the rx channel and pushes them to the WebSocket sender.
///
/// This function handles the outbound message flow: broadcasts and error events
/// (via rx channel) are sent to this client's WebSocket connection.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<String>,
    mut sender: SplitSink<WebSocket, Message>,
    mut filter: BacklogFilter,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if !filter.admit(&msg) {
                continue;
            }
            if sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    })
}

/// Processes inbound frames one at a time, in arrival order.
async fn receive_loop(
    mut receiver: SplitStream<WebSocket>,
    app: Arc<AppState>,
    nickname: Nickname,
    reply: PusherChannel,
) {
    while let Some(msg) = receiver.next().await {
        let msg = match msg {
            Ok(msg) => msg,
            Err(e) => {
                tracing::warn!("WebSocket error on '{}': {}", nickname.as_str(), e);
                break;
            }
        };

        match msg {
            Message::Text(text) => {
                let result = match InboundChatMessage::from_frame(text.as_str()) {
                    Ok(inbound) => {
                        app.send_message_usecase
                            .execute(&nickname, inbound.nickname, inbound.content)
                            .await
                    }
                    Err(e) => {
                        tracing::debug!("Malformed frame from '{}': {}", nickname.as_str(), e);
                        Err(SendMessageError::Malformed)
                    }
                };

                match result {
                    Ok(message) => {
                        tracing::debug!(
                            "Accepted message {} from '{}'",
                            message.id.as_str(),
                            nickname.as_str()
                        );
                    }
                    Err(e) => push_error(&reply, &e.to_string()),
                }
            }
            Message::Binary(_) => push_error(&reply, BINARY_NOT_SUPPORTED),
            Message::Ping(_) | Message::Pong(_) => {
                // Ping/pong is handled automatically by the WebSocket protocol
            }
            Message::Close(_) => {
                tracing::debug!("'{}' requested close", nickname.as_str());
                break;
            }
        }
    }
}
