//! Server endpoint configuration.

use crate::error::ClientError;

/// Default server URL when none is configured
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";

/// Base URLs derived from the configured server URL
///
/// | configured           | http base            | websocket                |
/// |----------------------|----------------------|--------------------------|
/// | `http://host:8000`   | `http://host:8000`   | `ws://host:8000/ws`      |
/// | `https://chat.example` | `https://chat.example` | `wss://chat.example/ws` |
/// | `host:8000`          | `http://host:8000`   | `ws://host:8000/ws`      |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEndpoint {
    http_base: String,
    ws_url: String,
}

impl ServerEndpoint {
    /// Parse a server URL.
    ///
    /// # Examples
    ///
    /// ```
    /// use sokdo_client::config::ServerEndpoint;
    ///
    /// let endpoint = ServerEndpoint::parse("https://chat.example/").unwrap();
    /// assert_eq!(endpoint.ws_url(), "wss://chat.example/ws");
    /// assert_eq!(endpoint.send_url(), "https://chat.example/send");
    /// ```
    pub fn parse(value: &str) -> Result<Self, ClientError> {
        let trimmed = value.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(ClientError::InvalidServerUrl(value.to_string()));
        }

        let (http_scheme, ws_scheme, rest) = if let Some(rest) = trimmed.strip_prefix("https://") {
            ("https", "wss", rest)
        } else if let Some(rest) = trimmed.strip_prefix("http://") {
            ("http", "ws", rest)
        } else if let Some(rest) = trimmed.strip_prefix("wss://") {
            ("https", "wss", rest)
        } else if let Some(rest) = trimmed.strip_prefix("ws://") {
            ("http", "ws", rest)
        } else if trimmed.contains("://") {
            return Err(ClientError::InvalidServerUrl(value.to_string()));
        } else {
            ("http", "ws", trimmed)
        };

        // `ws://host/ws` のように WebSocket のパスまで指定された場合
        let authority = rest.strip_suffix("/ws").unwrap_or(rest);
        if authority.is_empty() {
            return Err(ClientError::InvalidServerUrl(value.to_string()));
        }

        Ok(Self {
            http_base: format!("{}://{}", http_scheme, authority),
            ws_url: format!("{}://{}/ws", ws_scheme, authority),
        })
    }

    pub fn http_base(&self) -> &str {
        &self.http_base
    }

    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }

    /// `POST /send`
    pub fn send_url(&self) -> String {
        format!("{}/send", self.http_base)
    }

    /// `GET|POST /messages`
    pub fn messages_url(&self) -> String {
        format!("{}/messages", self.http_base)
    }
}

impl Default for ServerEndpoint {
    fn default() -> Self {
        Self {
            http_base: DEFAULT_SERVER_URL.to_string(),
            ws_url: "ws://localhost:8000/ws".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_http_url() {
        // テスト項目: http:// の URL から ws:// の WebSocket URL が導出される
        // given (前提条件):
        let value = "http://localhost:8000";

        // when (操作):
        let endpoint = ServerEndpoint::parse(value).unwrap();

        // then (期待する結果):
        assert_eq!(endpoint.http_base(), "http://localhost:8000");
        assert_eq!(endpoint.ws_url(), "ws://localhost:8000/ws");
        assert_eq!(endpoint, ServerEndpoint::default());
    }

    #[test]
    fn test_parse_https_url_with_trailing_slash() {
        // テスト項目: https:// の URL は末尾のスラッシュを除去し wss:// を使う
        // given (前提条件):
        let value = "https://chat.example.com//";

        // when (操作):
        let endpoint = ServerEndpoint::parse(value).unwrap();

        // then (期待する結果):
        assert_eq!(endpoint.http_base(), "https://chat.example.com");
        assert_eq!(endpoint.ws_url(), "wss://chat.example.com/ws");
        assert_eq!(endpoint.messages_url(), "https://chat.example.com/messages");
    }

    #[test]
    fn test_parse_without_scheme() {
        // テスト項目: スキームの無い値は http:// / ws:// として扱われる
        // given (前提条件):
        let value = "127.0.0.1:9000";

        // when (操作):
        let endpoint = ServerEndpoint::parse(value).unwrap();

        // then (期待する結果):
        assert_eq!(endpoint.http_base(), "http://127.0.0.1:9000");
        assert_eq!(endpoint.ws_url(), "ws://127.0.0.1:9000/ws");
    }

    #[test]
    fn test_parse_websocket_url() {
        // テスト項目: ws://host/ws の形式でも同じエンドポイントになる
        // given (前提条件):
        let value = "ws://127.0.0.1:9000/ws";

        // when (操作):
        let endpoint = ServerEndpoint::parse(value).unwrap();

        // then (期待する結果):
        assert_eq!(endpoint.http_base(), "http://127.0.0.1:9000");
        assert_eq!(endpoint.ws_url(), "ws://127.0.0.1:9000/ws");
    }

    #[test]
    fn test_parse_invalid_url() {
        // テスト項目: 空文字列や未知のスキームはエラーになる
        // given (前提条件):

        // when (操作):
        let empty = ServerEndpoint::parse("  ");
        let unknown = ServerEndpoint::parse("ftp://example.com");

        // then (期待する結果):
        assert!(matches!(empty, Err(ClientError::InvalidServerUrl(_))));
        assert!(matches!(unknown, Err(ClientError::InvalidServerUrl(_))));
    }
}
