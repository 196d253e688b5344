//! Configuration types
//!
//! Service configuration, overridable through `GGUFCHAT_*` environment variables.

use crate::storage::{get_data_dir, StorageError};
use crate::types::model::ModelRef;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// The artifact to fetch and serve
    pub model: ModelRef,
    /// Directory for downloaded model files (platform data dir when unset)
    pub models_dir: Option<PathBuf>,
    /// Context window size in tokens
    pub context_size: u32,
    /// CPU threads used for inference
    pub n_threads: u32,
    /// Prompt-processing batch size
    pub n_batch: u32,
    /// Chat template tag, e.g. "llama-3" or "chatml"
    pub template: String,
    /// System prompt prepended to every conversation
    pub system_prompt: Option<String>,
    /// Maximum number of tokens to generate per turn
    pub max_tokens: u32,
    /// Temperature parameter for text generation (0.0 - 2.0)
    pub temperature: f32,
    /// Top-p (nucleus sampling) parameter (0.0 - 1.0)
    pub top_p: f32,
    /// Address the server binds to
    pub host: String,
    /// Port the server binds to
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model: ModelRef::new("Jompatron/10k-base-llama", "merged_model.Q4_K_M.gguf"),
            models_dir: None,
            context_size: 4096,
            n_threads: 4,
            n_batch: 128,
            template: "llama-3".to_string(),
            system_prompt: None,
            max_tokens: 512,
            temperature: 0.7,
            top_p: 0.9,
            host: "0.0.0.0".to_string(),
            port: 7860,
        }
    }
}

impl AppConfig {
    /// Build a configuration from the environment, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            model: ModelRef::new(
                env_string("GGUFCHAT_MODEL_REPO", &defaults.model.repo_id),
                env_string("GGUFCHAT_MODEL_FILE", &defaults.model.filename),
            ),
            models_dir: std::env::var("GGUFCHAT_MODELS_DIR").ok().map(PathBuf::from),
            context_size: env_parse("GGUFCHAT_CTX_SIZE", defaults.context_size),
            n_threads: env_parse("GGUFCHAT_THREADS", defaults.n_threads),
            n_batch: env_parse("GGUFCHAT_BATCH_SIZE", defaults.n_batch),
            template: env_string("GGUFCHAT_TEMPLATE", &defaults.template),
            system_prompt: std::env::var("GGUFCHAT_SYSTEM_PROMPT")
                .ok()
                .filter(|s| !s.is_empty()),
            max_tokens: env_parse("GGUFCHAT_MAX_TOKENS", defaults.max_tokens),
            temperature: env_parse("GGUFCHAT_TEMPERATURE", defaults.temperature),
            top_p: env_parse("GGUFCHAT_TOP_P", defaults.top_p),
            host: env_string("GGUFCHAT_HOST", &defaults.host),
            port: env_parse("GGUFCHAT_PORT", defaults.port),
        }
    }

    /// Validate configuration values
    ///
    /// Ensures all parameters are within acceptable ranges.
    pub fn validate(&mut self) {
        self.temperature = self.temperature.clamp(0.0, 2.0);
        self.top_p = self.top_p.clamp(0.0, 1.0);

        if self.n_threads == 0 {
            self.n_threads = 4;
        }
        if self.n_batch == 0 {
            self.n_batch = 128;
        }
        if self.context_size < 512 {
            self.context_size = 512;
        }

        self.max_tokens = self.max_tokens.max(1);

        // Generation can never exceed what the context window leaves room for
        if self.max_tokens >= self.context_size {
            self.max_tokens = self.context_size / 2;
        }
    }

    /// Directory model artifacts are downloaded into
    pub fn resolve_models_dir(&self) -> Result<PathBuf, StorageError> {
        match &self.models_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(get_data_dir()?.join("models")),
        }
    }
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: FromStr + Copy>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                tracing::warn!("Invalid {}='{}', using default", key, raw);
                default
            }
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.context_size, 4096);
        assert_eq!(config.n_threads, 4);
        assert_eq!(config.n_batch, 128);
        assert_eq!(config.template, "llama-3");
        assert_eq!(config.port, 7860);
        assert!(config.models_dir.is_none());
        assert!(config.system_prompt.is_none());
    }

    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();

        config.temperature = 5.0;
        config.validate();
        assert_eq!(config.temperature, 2.0);

        config.temperature = -1.0;
        config.validate();
        assert_eq!(config.temperature, 0.0);

        config.top_p = 2.0;
        config.validate();
        assert_eq!(config.top_p, 1.0);

        config.n_threads = 0;
        config.n_batch = 0;
        config.validate();
        assert_eq!(config.n_threads, 4);
        assert_eq!(config.n_batch, 128);
    }

    #[test]
    fn test_max_tokens_capped_below_context() {
        let mut config = AppConfig::default();
        config.context_size = 2048;
        config.max_tokens = 4096;
        config.validate();
        assert_eq!(config.max_tokens, 1024);
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let json = serde_json::to_string(&config).expect("Failed to serialize");
        let deserialized: AppConfig = serde_json::from_str(&json).expect("Failed to deserialize");
        assert_eq!(config.context_size, deserialized.context_size);
        assert_eq!(config.model, deserialized.model);
    }

    #[test]
    fn test_env_parse_unset_uses_default() {
        let value: u32 = env_parse("GGUFCHAT_TEST_UNSET_VARIABLE", 42);
        assert_eq!(value, 42);
    }
}
