//! Domain logic for client-side operations.
//!
//! This module contains pure functions that implement business logic
//! without side effects, making them easy to test.

use crate::error::ClientError;

/// Close code sent by the server when the handshake carries no nickname
pub const CLOSE_NICKNAME_REQUIRED: u16 = 4000;
/// Close code sent by the server when the nickname is not allowed
pub const CLOSE_FORBIDDEN_NICKNAME: u16 = 4003;

/// Check if the client should stop immediately based on the error type.
///
/// # Returns
///
/// `true` for explicit policy rejections from the server (missing or forbidden
/// nickname), `false` otherwise
pub fn should_exit_immediately(error: &ClientError) -> bool {
    matches!(
        error,
        ClientError::NicknameRequired | ClientError::ForbiddenNickname(_)
    )
}

/// Check if the client should attempt to reconnect.
///
/// Connection loss is retried without limit until the listener is cancelled
/// or the server rejects the nickname.
///
/// # Arguments
///
/// * `error` - The client error that ended the last session
/// * `cancelled` - Whether logout has been requested
pub fn should_attempt_reconnect(error: &ClientError, cancelled: bool) -> bool {
    !cancelled && !should_exit_immediately(error)
}

/// Map a close frame received from the server to the error it stands for.
///
/// # Arguments
///
/// * `code` - The close code
/// * `nickname` - The nickname this client connected with
pub fn error_from_close(code: u16, nickname: &str) -> ClientError {
    match code {
        CLOSE_NICKNAME_REQUIRED => ClientError::NicknameRequired,
        CLOSE_FORBIDDEN_NICKNAME => ClientError::ForbiddenNickname(nickname.to_string()),
        other => ClientError::ConnectionError(format!("closed by server (code {})", other)),
    }
}
