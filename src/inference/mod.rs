//! LLM inference engine
//!
//! This module handles all interaction with llama-cpp for model loading and
//! chat completion, plus the prompt templates that feed it.

pub mod engine;
pub mod template;

pub use engine::{EngineConfig, GenerationError, GenerationParams, LlamaEngine, LoadError};
pub use template::TemplateTag;
