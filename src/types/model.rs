//! Model reference
//!
//! Identifies the GGUF artifact this deployment fetches and serves.

use serde::{Deserialize, Serialize};

/// A GGUF artifact on the HuggingFace Hub
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRef {
    /// Repository id, e.g. "TheBloke/Llama-2-7B-GGUF"
    pub repo_id: String,
    /// Exact filename of the artifact inside the repository
    pub filename: String,
}

impl ModelRef {
    pub fn new(repo_id: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            repo_id: repo_id.into(),
            filename: filename.into(),
        }
    }

    /// Direct download URL for the artifact
    pub fn resolve_url(&self) -> String {
        format!(
            "https://huggingface.co/{}/resolve/main/{}",
            self.repo_id, self.filename
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_url() {
        let model = ModelRef::new("TheBloke/Llama-2-7B-GGUF", "llama-2-7b.Q4_K_M.gguf");
        assert_eq!(
            model.resolve_url(),
            "https://huggingface.co/TheBloke/Llama-2-7B-GGUF/resolve/main/llama-2-7b.Q4_K_M.gguf"
        );
    }
}
