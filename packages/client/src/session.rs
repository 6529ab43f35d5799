//! Chat client session: login, send and logout.

use std::time::Duration;

use reqwest::StatusCode;
use sokdo_server::infrastructure::dto::websocket::ChatMessageDto;
use tokio::sync::mpsc;

use crate::{
    config::ServerEndpoint,
    error::ClientError,
    listener::{ListenerEvent, ListenerHandle, RECONNECT_DELAY},
};

/// How a call to [`ChatClient::send`] was delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Written to the live WebSocket
    WebSocket,
    /// Posted to `/send` because no WebSocket was open
    Http,
    /// Blank input, nothing was sent
    Ignored,
}

pub struct ChatClient {
    endpoint: ServerEndpoint,
    http: reqwest::Client,
    nickname: Option<String>,
    listener: Option<ListenerHandle>,
    reconnect_delay: Duration,
}

impl ChatClient {
    pub fn new(endpoint: ServerEndpoint) -> Self {
        Self {
            endpoint,
            http: reqwest::Client::new(),
            nickname: None,
            listener: None,
            reconnect_delay: RECONNECT_DELAY,
        }
    }

    /// Override the delay between reconnection attempts
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn endpoint(&self) -> &ServerEndpoint {
        &self.endpoint
    }

    /// Nickname of the current session, if logged in
    pub fn nickname(&self) -> Option<&str> {
        self.nickname.as_deref()
    }

    /// Start a session as `nickname`.
    ///
    /// Any previous session is logged out first. The returned receiver yields
    /// everything the background listener observes until logout.
    pub async fn login(
        &mut self,
        nickname: &str,
    ) -> Result<mpsc::UnboundedReceiver<ListenerEvent>, ClientError> {
        let nickname = nickname.trim();
        if nickname.is_empty() {
            return Err(ClientError::NicknameRequired);
        }

        self.logout().await;

        let (listener, events) = ListenerHandle::spawn(
            self.endpoint.clone(),
            nickname.to_string(),
            self.reconnect_delay,
        );
        self.listener = Some(listener);
        self.nickname = Some(nickname.to_string());
        tracing::info!("Logged in as '{}'", nickname);

        Ok(events)
    }

    /// End the session and wait for the listener to stop. Safe to call twice.
    pub async fn logout(&mut self) {
        if let Some(mut listener) = self.listener.take() {
            listener.cancel().await;
        }
        if let Some(nickname) = self.nickname.take() {
            tracing::info!("Logged out '{}'", nickname);
        }
    }

    pub async fn is_connected(&self) -> bool {
        match &self.listener {
            Some(listener) => listener.is_connected().await,
            None => false,
        }
    }

    /// Send `content` as the logged-in nickname.
    ///
    /// Uses the WebSocket when it is open and `POST /send` otherwise.
    pub async fn send(&self, content: &str) -> Result<Delivery, ClientError> {
        if content.trim().is_empty() {
            return Ok(Delivery::Ignored);
        }
        let nickname = self.nickname.as_deref().ok_or(ClientError::NotLoggedIn)?;

        let payload = ChatMessageDto {
            nickname: nickname.to_string(),
            content: content.to_string(),
        };

        if let Some(listener) = &self.listener {
            let json = serde_json::to_string(&payload)
                .map_err(|e| ClientError::RequestFailed(e.to_string()))?;
            if listener.send(json).await {
                return Ok(Delivery::WebSocket);
            }
        }

        tracing::debug!("WebSocket not open, sending over HTTP");
        self.send_http(&payload).await?;
        Ok(Delivery::Http)
    }

    /// `POST /send` with `{nickname, content}`
    pub async fn send_http(&self, payload: &ChatMessageDto) -> Result<(), ClientError> {
        let response = self
            .http
            .post(self.endpoint.send_url())
            .json(payload)
            .send()
            .await?;

        match response.status() {
            StatusCode::FORBIDDEN => Err(ClientError::ForbiddenNickname(payload.nickname.clone())),
            status if status.is_success() => Ok(()),
            status => Err(ClientError::RequestFailed(format!(
                "POST /send returned {}",
                status
            ))),
        }
    }
}
