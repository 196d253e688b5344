//! Per-turn transcript handling

use serde::{Deserialize, Serialize};

use crate::inference::{GenerationError, GenerationParams, LlamaEngine};
use crate::types::message::Message;

/// One prior user/assistant turn pair; either side may be absent
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Exchange {
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub assistant: Option<String>,
}

fn non_empty(side: &Option<String>) -> Option<&str> {
    side.as_deref().filter(|s| !s.is_empty())
}

/// Build the message sequence for one turn
///
/// Transcript order is preserved; the new user message is always last. A side
/// that is absent or empty contributes nothing.
pub fn build_messages(
    system_prompt: Option<&str>,
    transcript: &[Exchange],
    new_user_text: &str,
) -> Vec<Message> {
    let mut messages = Vec::with_capacity(transcript.len() * 2 + 2);

    if let Some(prompt) = system_prompt.filter(|s| !s.is_empty()) {
        messages.push(Message::system(prompt));
    }

    for exchange in transcript {
        if let Some(text) = non_empty(&exchange.user) {
            messages.push(Message::user(text));
        }
        if let Some(text) = non_empty(&exchange.assistant) {
            messages.push(Message::assistant(text));
        }
    }

    messages.push(Message::user(new_user_text));
    messages
}

/// Run one conversational turn against the shared engine
///
/// Stateless apart from the injected engine: the reply is returned unchanged
/// and nothing is recorded here; the caller owns the transcript.
pub fn handle_turn(
    engine: &LlamaEngine,
    params: &GenerationParams,
    system_prompt: Option<&str>,
    transcript: &[Exchange],
    new_user_text: &str,
) -> Result<String, GenerationError> {
    let messages = build_messages(system_prompt, transcript, new_user_text);
    tracing::debug!(messages = messages.len(), "Running turn");
    engine.complete(&messages, params)
}
