//! llama.cpp engine
//!
//! Loads the GGUF model once at startup and serves chat completions from it.
//! `complete` blocks for the whole generation and is not reentrant; callers
//! serialize access to the engine.

use std::num::NonZeroU32;
use std::path::Path;
use std::time::Instant;

use llama_cpp_2::context::params::LlamaContextParams;
use llama_cpp_2::llama_backend::LlamaBackend;
use llama_cpp_2::llama_batch::LlamaBatch;
use llama_cpp_2::model::params::LlamaModelParams;
use llama_cpp_2::model::{AddBos, LlamaModel, Special};
use llama_cpp_2::sampling::LlamaSampler;
use thiserror::Error;

use crate::inference::template::TemplateTag;
use crate::types::message::Message;

const SAMPLER_SEED: u32 = 1234;

/// Fixed engine configuration, applied once at load time
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Max tokens the model attends over in one call
    pub context_size: u32,
    /// CPU threads for prompt processing and generation
    pub n_threads: u32,
    /// Prompt-processing batch size
    pub n_batch: u32,
    /// Chat template tag, by configuration name
    pub template: String,
}

/// Per-call generation parameters
#[derive(Debug, Clone)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

/// Startup failure while bringing up the model
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Unknown chat template tag: '{0}'")]
    UnknownTemplate(String),
    #[error("Model file not found: {0}")]
    FileMissing(String),
    #[error("Failed to initialize llama backend: {0}")]
    Backend(String),
    #[error("Failed to load model: {0}")]
    Model(String),
}

/// Failure of a single completion call
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Failed to create inference context: {0}")]
    Context(String),
    #[error("Tokenization failed: {0}")]
    Tokenize(String),
    #[error("Prompt is {got} tokens but the context window holds {limit}")]
    ContextOverflow { got: usize, limit: u32 },
    #[error("Decode failed: {0}")]
    Decode(String),
}

/// Long-lived inference handle wrapping the loaded model
pub struct LlamaEngine {
    backend: LlamaBackend,
    model: LlamaModel,
    template: TemplateTag,
    config: EngineConfig,
}

impl LlamaEngine {
    /// Load a GGUF model with a fixed runtime configuration
    pub fn load(path: &Path, config: EngineConfig) -> Result<Self, LoadError> {
        let template = TemplateTag::parse(&config.template)
            .ok_or_else(|| LoadError::UnknownTemplate(config.template.clone()))?;

        if !path.exists() {
            return Err(LoadError::FileMissing(path.display().to_string()));
        }

        let backend = LlamaBackend::init().map_err(|e| LoadError::Backend(e.to_string()))?;

        let model_params = LlamaModelParams::default();
        let model = LlamaModel::load_from_file(&backend, path, &model_params)
            .map_err(|e| LoadError::Model(e.to_string()))?;

        tracing::info!(
            path = %path.display(),
            template = template.name(),
            context_size = config.context_size,
            "Model loaded"
        );

        Ok(Self {
            backend,
            model,
            template,
            config,
        })
    }

    /// Template the engine resolved at load time
    pub fn template(&self) -> TemplateTag {
        self.template
    }

    /// Run one chat completion and return the generated text
    ///
    /// A fresh context is created per call, so a failed turn leaves the engine
    /// fully usable for the next one.
    pub fn complete(
        &self,
        messages: &[Message],
        params: &GenerationParams,
    ) -> Result<String, GenerationError> {
        let prompt = self.template.render(messages);

        let tokens = self
            .model
            .str_to_token(&prompt, AddBos::Always)
            .map_err(|e| GenerationError::Tokenize(e.to_string()))?;

        let n_prompt = tokens.len();
        if n_prompt as u32 >= self.config.context_size {
            return Err(GenerationError::ContextOverflow {
                got: n_prompt,
                limit: self.config.context_size,
            });
        }

        let n_ctx = NonZeroU32::new(self.config.context_size)
            .ok_or_else(|| GenerationError::Context("context size must be non-zero".into()))?;
        let n_threads = self.config.n_threads as i32;
        let ctx_params = LlamaContextParams::default()
            .with_n_ctx(Some(n_ctx))
            .with_n_batch(self.config.n_batch)
            .with_n_threads(n_threads)
            .with_n_threads_batch(n_threads);

        let mut ctx = self
            .model
            .new_context(&self.backend, ctx_params)
            .map_err(|e| GenerationError::Context(e.to_string()))?;

        let batch_size = self.config.n_batch as usize;
        let mut batch = LlamaBatch::new(batch_size, 1);
        let last_pos = (n_prompt as i32).saturating_sub(1);

        // Prefill in n_batch-sized chunks; larger batches are rejected by llama.cpp
        let mut pos = 0i32;
        for chunk in tokens.chunks(batch_size) {
            batch.clear();
            for (j, &token) in chunk.iter().enumerate() {
                let p = pos + j as i32;
                batch
                    .add(token, p, &[0], p == last_pos)
                    .map_err(|e| GenerationError::Decode(e.to_string()))?;
            }
            ctx.decode(&mut batch)
                .map_err(|e| GenerationError::Decode(e.to_string()))?;
            pos += chunk.len() as i32;
        }

        let mut sampler = build_sampler(params);

        let max_gen = params
            .max_tokens
            .min(self.config.context_size - n_prompt as u32);

        let start = Instant::now();
        let mut output = String::new();
        let mut n_cur = n_prompt as i32;
        let mut generated: u32 = 0;

        for _ in 0..max_gen {
            let token = sampler.sample(&ctx, batch.n_tokens() - 1);
            sampler.accept(token);

            if self.model.is_eog_token(token) {
                break;
            }

            let piece = self
                .model
                .token_to_str(token, Special::Tokenize)
                .unwrap_or_else(|_| String::new());
            output.push_str(&piece);

            batch.clear();
            batch
                .add(token, n_cur, &[0], true)
                .map_err(|e| GenerationError::Decode(e.to_string()))?;

            n_cur += 1;
            generated += 1;

            ctx.decode(&mut batch)
                .map_err(|e| GenerationError::Decode(e.to_string()))?;
        }

        tracing::debug!(
            prompt_tokens = n_prompt,
            generated,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Completion finished"
        );

        Ok(output.trim().to_string())
    }
}

fn build_sampler(params: &GenerationParams) -> LlamaSampler {
    if params.temperature <= 0.0 {
        return LlamaSampler::greedy();
    }
    LlamaSampler::chain_simple([
        LlamaSampler::top_p(params.top_p, 1),
        LlamaSampler::temp(params.temperature),
        LlamaSampler::dist(SAMPLER_SEED),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(template: &str) -> EngineConfig {
        EngineConfig {
            context_size: 4096,
            n_threads: 4,
            n_batch: 128,
            template: template.to_string(),
        }
    }

    #[test]
    fn load_rejects_unknown_template() {
        let err = LlamaEngine::load(Path::new("/nonexistent/model.gguf"), test_config("alpaca"))
            .err()
            .unwrap();
        assert!(matches!(err, LoadError::UnknownTemplate(_)));
    }

    #[test]
    fn load_rejects_missing_file() {
        let err = LlamaEngine::load(Path::new("/nonexistent/model.gguf"), test_config("llama-3"))
            .err()
            .unwrap();
        assert!(matches!(err, LoadError::FileMissing(_)));
    }
}
