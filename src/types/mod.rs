//! Core types
//!
//! Configuration, model reference, and chat message structures.

pub mod config;
pub mod message;
pub mod model;

pub use config::AppConfig;
pub use message::{Message, Role};
pub use model::ModelRef;
