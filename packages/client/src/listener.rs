//! Background listener owning the WebSocket connection.
//!
//! On every (re)connect the listener loads the history over HTTP, opens the
//! WebSocket and forwards everything it receives as [`ListenerEvent`]s.
//! Connection loss is retried after a fixed delay until the listener is
//! cancelled or the server rejects the nickname.
//!
//! Cancellation is observed at every suspension point (history request,
//! connect, receive, back-off sleep).

use std::{sync::Arc, time::Duration};

use futures_util::{SinkExt, StreamExt};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::StatusCode;
use sokdo_server::infrastructure::dto::{
    http::FetchMessagesRequest,
    websocket::{MessageDto, ServerEvent},
};
use tokio::{
    sync::{Mutex, mpsc, watch},
    task::JoinHandle,
};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{
        Message,
        client::IntoClientRequest,
        handshake::client::Request,
        http::HeaderValue,
    },
};

use crate::{
    config::ServerEndpoint,
    domain::{error_from_close, should_attempt_reconnect, should_exit_immediately},
    error::ClientError,
};

/// Delay between reconnection attempts
pub const RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Handshake header carrying the percent-encoded nickname
const NICKNAME_HEADER: &str = "x-nickname";

/// What the listener reports to the foreground loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerEvent {
    /// History loaded and WebSocket open
    Connected,
    /// A stored message record (history or live)
    Message(MessageDto),
    /// In-band `{error}` event from the server
    Error(String),
    /// A text frame that is neither a record nor an error event
    Raw(String),
    /// Connection lost; a reconnect follows after the delay
    Disconnected(String),
    /// The server rejected the nickname; the listener has stopped
    Rejected(ClientError),
}

/// Sender half of the live WebSocket, `None` while disconnected
type OutboundSlot = Arc<Mutex<Option<mpsc::UnboundedSender<String>>>>;

/// Handle to a running listener task
pub struct ListenerHandle {
    cancel: watch::Sender<bool>,
    outbound: OutboundSlot,
    task: Option<JoinHandle<Result<(), ClientError>>>,
}

impl ListenerHandle {
    /// Spawn a listener for `nickname`.
    ///
    /// Returns the handle and the receiver of the events it produces.
    pub fn spawn(
        endpoint: ServerEndpoint,
        nickname: String,
        reconnect_delay: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<ListenerEvent>) {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let outbound: OutboundSlot = Arc::new(Mutex::new(None));

        let listener = Listener {
            endpoint,
            nickname,
            http: reqwest::Client::new(),
            events: events_tx,
            outbound: outbound.clone(),
            cancel: cancel_rx,
            reconnect_delay,
        };
        let task = tokio::spawn(listener.run());

        (
            Self {
                cancel: cancel_tx,
                outbound,
                task: Some(task),
            },
            events_rx,
        )
    }

    /// Whether the WebSocket is currently open
    pub async fn is_connected(&self) -> bool {
        self.outbound
            .lock()
            .await
            .as_ref()
            .is_some_and(|sender| !sender.is_closed())
    }

    /// Queue a text frame on the live WebSocket.
    ///
    /// Returns false when there is no open connection.
    pub async fn send(&self, payload: String) -> bool {
        match self.outbound.lock().await.as_ref() {
            Some(sender) => sender.send(payload).is_ok(),
            None => false,
        }
    }

    /// Stop the listener and wait until it has closed the transport.
    ///
    /// Calling it again after the listener has stopped does nothing.
    pub async fn cancel(&mut self) {
        self.cancel.send_replace(true);
        let Some(task) = self.task.take() else {
            return;
        };
        match task.await {
            Ok(Ok(())) => tracing::debug!("Listener stopped"),
            Ok(Err(e)) => tracing::debug!("Listener had stopped: {}", e),
            Err(e) => tracing::warn!("Listener task failed: {}", e),
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.cancel.send_replace(true);
    }
}

/// Resolves once cancellation has been requested (or the handle is gone)
async fn wait_cancelled(cancel: &mut watch::Receiver<bool>) {
    let _ = cancel.wait_for(|cancelled| *cancelled).await;
}

struct Listener {
    endpoint: ServerEndpoint,
    nickname: String,
    http: reqwest::Client,
    events: mpsc::UnboundedSender<ListenerEvent>,
    outbound: OutboundSlot,
    cancel: watch::Receiver<bool>,
    reconnect_delay: Duration,
}

impl Listener {
    async fn run(self) -> Result<(), ClientError> {
        let mut cancel = self.cancel.clone();
        let mut attempt: u64 = 0;

        loop {
            attempt += 1;
            tracing::info!(
                "Connecting to {} as '{}' (attempt {})",
                self.endpoint.ws_url(),
                self.nickname,
                attempt
            );

            let error = match self.connect_and_stream().await {
                Ok(()) => return Ok(()),
                Err(e) => e,
            };

            let cancelled = *cancel.borrow();
            if !should_attempt_reconnect(&error, cancelled) {
                if should_exit_immediately(&error) {
                    tracing::error!("{}", error);
                    self.emit(ListenerEvent::Rejected(error.clone()));
                    return Err(error);
                }
                return Ok(());
            }

            tracing::warn!(
                "Connection lost: {}. Reconnecting in {:?}...",
                error,
                self.reconnect_delay
            );
            self.emit(ListenerEvent::Disconnected(error.to_string()));

            tokio::select! {
                _ = tokio::time::sleep(self.reconnect_delay) => {}
                _ = wait_cancelled(&mut cancel) => return Ok(()),
            }
        }
    }

    /// One connection: history, handshake, then stream until it ends.
    ///
    /// Returns `Ok(())` only when cancelled.
    async fn connect_and_stream(&self) -> Result<(), ClientError> {
        let mut cancel = self.cancel.clone();

        // 1. 履歴の取得
        let history = tokio::select! {
            history = self.load_history() => history?,
            _ = wait_cancelled(&mut cancel) => return Ok(()),
        };

        // 2. WebSocket ハンドシェイク
        let request = self.build_request()?;
        let (ws_stream, _) = tokio::select! {
            connected = connect_async(request) => connected?,
            _ = wait_cancelled(&mut cancel) => return Ok(()),
        };
        tracing::info!("Connected to chat server!");

        // 3. 受信と送信
        let (mut write, mut read) = ws_stream.split();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
        *self.outbound.lock().await = Some(out_tx);

        self.emit(ListenerEvent::Connected);
        for message in history {
            self.emit(ListenerEvent::Message(message));
        }

        let result = loop {
            tokio::select! {
                incoming = read.next() => match incoming {
                    Some(Ok(Message::Text(text))) => self.handle_text(text.as_str()),
                    Some(Ok(Message::Close(frame))) => {
                        break Err(match frame {
                            Some(frame) => error_from_close(u16::from(frame.code), &self.nickname),
                            None => ClientError::ConnectionError("closed by server".to_string()),
                        });
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => break Err(e.into()),
                    None => break Err(ClientError::ConnectionError("connection closed".to_string())),
                },
                Some(payload) = out_rx.recv() => {
                    if let Err(e) = write.send(Message::text(payload)).await {
                        break Err(e.into());
                    }
                }
                _ = wait_cancelled(&mut cancel) => {
                    if let Err(e) = write.close().await {
                        tracing::debug!("Failed to close WebSocket: {}", e);
                    }
                    break Ok(());
                }
            }
        };

        *self.outbound.lock().await = None;
        result
    }

    fn build_request(&self) -> Result<Request, ClientError> {
        let mut request = self.endpoint.ws_url().into_client_request()?;
        let encoded = utf8_percent_encode(&self.nickname, NON_ALPHANUMERIC).to_string();
        let value = HeaderValue::from_str(&encoded)
            .map_err(|e| ClientError::ConnectionError(e.to_string()))?;
        request.headers_mut().insert(NICKNAME_HEADER, value);
        Ok(request)
    }

    /// `POST /messages` with `{nickname}`
    async fn load_history(&self) -> Result<Vec<MessageDto>, ClientError> {
        let response = self
            .http
            .post(self.endpoint.messages_url())
            .json(&FetchMessagesRequest {
                nickname: self.nickname.clone(),
                after: None,
            })
            .send()
            .await?;

        match response.status() {
            StatusCode::FORBIDDEN => Err(ClientError::ForbiddenNickname(self.nickname.clone())),
            status if status.is_success() => Ok(response.json().await?),
            status => Err(ClientError::RequestFailed(format!(
                "POST /messages returned {}",
                status
            ))),
        }
    }

    fn handle_text(&self, text: &str) {
        let event = match serde_json::from_str::<ServerEvent>(text) {
            Ok(ServerEvent::Message(message)) => ListenerEvent::Message(message),
            Ok(ServerEvent::Error(error)) => ListenerEvent::Error(error.error),
            Err(_) => ListenerEvent::Raw(text.to_string()),
        };
        self.emit(event);
    }

    fn emit(&self, event: ListenerEvent) {
        // 受信側が既に無い場合（ログアウト後）は捨てる
        let _ = self.events.send(event);
    }
}
