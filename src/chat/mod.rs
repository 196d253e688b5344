//! Conversation handling
//!
//! Converts the transcript held by the UI into the message sequence the
//! engine consumes, one turn at a time.

pub mod turn;

pub use turn::{build_messages, handle_turn, Exchange};
