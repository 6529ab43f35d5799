//! UseCase 層のエラー型
//!
//! `Display` の文字列はそのままクライアントへのエラーイベント（`{"error": ...}`）
//! として使われます。

use thiserror::Error;

use crate::domain::RepositoryError;

/// 参加者接続のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    /// ハンドシェイクにニックネームが無い（close 4000）
    #[error("Nickname required")]
    NicknameRequired,

    /// 許可リストに無いニックネーム（close 4003）
    #[error("Forbidden nickname")]
    Forbidden(String),
}

/// メッセージ送信のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendMessageError {
    /// JSON として解釈できない、またはフィールドの型が違う
    #[error("malformed message")]
    Malformed,

    /// nickname / content が欠けているか空
    #[error("invalid message format")]
    InvalidFormat,

    /// ペイロードのニックネームがハンドシェイク時のものと違う
    #[error("nickname mismatch")]
    NicknameMismatch { expected: String, actual: String },

    /// 許可リストに無いニックネーム（HTTP 経由の送信）
    #[error("Forbidden nickname")]
    Forbidden(String),

    #[error("failed to store message")]
    Storage(#[source] RepositoryError),
}

/// 履歴取得のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchMessagesError {
    #[error("Forbidden nickname")]
    Forbidden(Option<String>),

    #[error("failed to load messages")]
    Storage(#[source] RepositoryError),
}
