//! Domain 層のエラー型

use thiserror::Error;

/// 値オブジェクト生成時の検証エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("nickname must not be empty")]
    EmptyNickname,

    #[error("message content must not be empty")]
    EmptyContent,

    #[error("message id must not be empty")]
    EmptyMessageId,
}

/// 永続化層のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    /// ストレージへの読み書きに失敗
    #[error("storage error: {0}")]
    Storage(String),

    /// 保存済みデータが壊れている
    #[error("corrupted store: {0}")]
    Corrupted(String),
}

/// メッセージ送信（通知）のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagePushError {
    #[error("connection '{0}' is not registered")]
    ClientNotFound(String),

    #[error("failed to push message: {0}")]
    PushFailed(String),
}
