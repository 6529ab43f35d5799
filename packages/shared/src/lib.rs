//! Utilities shared by the Sokdo server and client.

pub mod logger;
pub mod time;
