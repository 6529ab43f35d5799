//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};

use crate::{
    infrastructure::dto::{
        http::{FetchMessagesQuery, FetchMessagesRequest, HealthDto, SendMessageResponse},
        websocket::{ChatMessageDto, ErrorDto, MessageDto},
    },
    ui::state::AppState,
    usecase::{FetchMessagesError, SendMessageError},
};

type ApiError = (StatusCode, Json<ErrorDto>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(ErrorDto::new(message)))
}

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthDto> {
    Json(HealthDto {
        status: "ok".to_string(),
        connections: state.message_pusher.count_connections().await,
    })
}

/// HTTP fallback for sending a message without a WebSocket connection
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ChatMessageDto>,
) -> Result<Json<SendMessageResponse>, ApiError> {
    match state
        .send_message_usecase
        .execute_http(body.nickname, body.content)
        .await
    {
        Ok(_) => Ok(Json(SendMessageResponse::success())),
        Err(e @ SendMessageError::Forbidden(_)) => {
            Err(api_error(StatusCode::FORBIDDEN, e.to_string()))
        }
        Err(e @ SendMessageError::Storage(_)) => {
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
        Err(e) => Err(api_error(StatusCode::BAD_REQUEST, e.to_string())),
    }
}

/// Get message history (`GET /messages?after=&nickname=`)
pub async fn get_messages(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FetchMessagesQuery>,
) -> Result<Json<Vec<MessageDto>>, ApiError> {
    fetch(&state, query.nickname.as_deref(), query.after.as_deref()).await
}

/// Get message history (`POST /messages` with `{nickname, after?}`)
pub async fn post_messages(
    State(state): State<Arc<AppState>>,
    Json(body): Json<FetchMessagesRequest>,
) -> Result<Json<Vec<MessageDto>>, ApiError> {
    fetch(&state, Some(&body.nickname), body.after.as_deref()).await
}

async fn fetch(
    state: &AppState,
    nickname: Option<&str>,
    after: Option<&str>,
) -> Result<Json<Vec<MessageDto>>, ApiError> {
    match state.fetch_messages_usecase.execute(nickname, after).await {
        // Domain Model から DTO への変換
        Ok(messages) => Ok(Json(messages.into_iter().map(MessageDto::from).collect())),
        Err(e @ FetchMessagesError::Forbidden(_)) => {
            Err(api_error(StatusCode::FORBIDDEN, e.to_string()))
        }
        Err(e @ FetchMessagesError::Storage(_)) => {
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}
