//! Terminal client for the Sokdo chat relay.
//!
//! A [`ChatClient`] logs in with a nickname, keeps a WebSocket open in the
//! background (reconnecting on loss) and falls back to HTTP for sending while
//! disconnected.

pub mod config;
pub mod domain;
pub mod error;
pub mod formatter;
pub mod listener;
pub mod runner;
pub mod session;
pub mod timeline;
mod ui;

pub use error::ClientError;
pub use listener::ListenerEvent;
pub use runner::run_client;
pub use session::{ChatClient, Delivery};
