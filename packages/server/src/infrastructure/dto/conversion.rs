//! Conversion logic between DTOs and domain entities.

use sokdo_shared::time::timestamp_to_rfc3339;

use crate::domain::entity;
use crate::infrastructure::dto::websocket as dto;

// ========================================
// Domain Entity → DTO
// ========================================

impl From<&entity::Message> for dto::MessageDto {
    fn from(model: &entity::Message) -> Self {
        Self {
            id: model.id.as_str().to_string(),
            nickname: model.nickname.as_str().to_string(),
            content: model.content.as_str().to_string(),
            timestamp: timestamp_to_rfc3339(model.timestamp.value()),
        }
    }
}

impl From<entity::Message> for dto::MessageDto {
    fn from(model: entity::Message) -> Self {
        Self::from(&model)
    }
}
