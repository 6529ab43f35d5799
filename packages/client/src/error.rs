//! Error types for the chat client.

use thiserror::Error;

/// Client-specific errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The server closed the handshake with 4000
    #[error("Nickname required")]
    NicknameRequired,

    /// The nickname is not on the server's allow-list (close 4003 / HTTP 403)
    #[error("Nickname '{0}' is not allowed on this server")]
    ForbiddenNickname(String),

    /// Connection error
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The server answered an HTTP request with an unexpected status
    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid server URL: '{0}'")]
    InvalidServerUrl(String),

    /// An operation that needs a nickname was called before login
    #[error("Not logged in")]
    NotLoggedIn,
}

impl From<reqwest::Error> for ClientError {
    fn from(error: reqwest::Error) -> Self {
        ClientError::ConnectionError(error.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(error: tokio_tungstenite::tungstenite::Error) -> Self {
        ClientError::ConnectionError(error.to_string())
    }
}
