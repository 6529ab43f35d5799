mod message;

pub use message::JsonFileMessageRepository;
