//! Sokdo chat relay server library.
//!
//! Persists chat messages, fans them out to every live WebSocket connection
//! and enforces a nickname allow-list at the connection boundary.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;
