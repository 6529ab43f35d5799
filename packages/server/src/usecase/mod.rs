//! UseCase layer: application operations built on the domain interfaces.

pub mod connect_participant;
pub mod disconnect_participant;
pub mod error;
pub mod fetch_messages;
pub mod send_message;
pub mod sweep_messages;

pub use connect_participant::{ConnectParticipantUseCase, ConnectedParticipant};
pub use disconnect_participant::DisconnectParticipantUseCase;
pub use error::{ConnectError, FetchMessagesError, SendMessageError};
pub use fetch_messages::FetchMessagesUseCase;
pub use send_message::SendMessageUseCase;
pub use sweep_messages::SweepMessagesUseCase;
