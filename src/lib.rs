//! ggufchat Library
//!
//! Core library for the ggufchat web chat service: fetch a GGUF artifact from
//! the HuggingFace Hub, load it into llama.cpp, serve a conversational page.

pub mod chat;
pub mod inference;
pub mod server;
pub mod storage;
pub mod types;
