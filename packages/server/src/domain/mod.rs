//! Domain layer: entities, value objects and the interfaces the use cases depend on.

pub mod entity;
pub mod error;
pub mod message_pusher;
pub mod policy;
pub mod repository;
pub mod retention;
pub mod value_object;

pub use entity::Message;
pub use error::{MessagePushError, RepositoryError, ValueObjectError};
pub use message_pusher::{MessagePusher, PusherChannel};
pub use policy::AccessPolicy;
pub use repository::MessageRepository;
#[cfg(test)]
pub use repository::MockMessageRepository;
pub use retention::select_expired;
pub use value_object::{ConnectionId, MessageContent, MessageId, Nickname, Timestamp};

/// Number of most recent messages kept in the store at rest.
pub const DEFAULT_RETENTION_LIMIT: usize = 50;

/// Number of messages returned by history retrieval when no limit is given.
pub const DEFAULT_HISTORY_LIMIT: usize = 30;
