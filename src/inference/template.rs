//! Chat prompt templates
//!
//! Serializes role-tagged messages into the prompt framing a model family
//! expects. The tag is set in configuration and resolved at model load time.

use crate::types::message::{Message, Role};

/// Prompt formatting convention used by a model family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateTag {
    /// `<|begin_of_text|><|start_header_id|>{role}<|end_header_id|>\n\n{content}<|eot_id|>`
    Llama3,
    /// `[INST] {content} [/INST]` with an optional `<<SYS>>` block
    Llama2,
    /// `<|im_start|>{role}\n{content}<|im_end|>\n`
    ChatMl,
    /// `<|{role}|>\n{content}</s>\n`
    TinyLlama,
}

impl TemplateTag {
    /// Parse a tag from its configuration name
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.trim().to_lowercase().as_str() {
            "llama-3" | "llama3" => Some(Self::Llama3),
            "llama-2" | "llama2" => Some(Self::Llama2),
            "chatml" | "chat-ml" => Some(Self::ChatMl),
            "tinyllama" | "tiny-llama" => Some(Self::TinyLlama),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Llama3 => "llama-3",
            Self::Llama2 => "llama-2",
            Self::ChatMl => "chatml",
            Self::TinyLlama => "tinyllama",
        }
    }

    /// Render a message sequence into a prompt ending with the assistant header
    pub fn render(&self, messages: &[Message]) -> String {
        match self {
            Self::Llama3 => render_llama3(messages),
            Self::Llama2 => render_llama2(messages),
            Self::ChatMl => render_chatml(messages),
            Self::TinyLlama => render_tinyllama(messages),
        }
    }
}

fn role_name(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

fn render_llama3(messages: &[Message]) -> String {
    let mut prompt = String::from("<|begin_of_text|>");
    for msg in messages {
        prompt.push_str("<|start_header_id|>");
        prompt.push_str(role_name(msg.role));
        prompt.push_str("<|end_header_id|>\n\n");
        prompt.push_str(&msg.content);
        prompt.push_str("<|eot_id|>");
    }
    prompt.push_str("<|start_header_id|>assistant<|end_header_id|>\n\n");
    prompt
}

fn render_llama2(messages: &[Message]) -> String {
    let mut prompt = String::new();
    let mut system_prompt = String::new();

    for msg in messages {
        match msg.role {
            Role::System => {
                system_prompt = msg.content.clone();
            }
            Role::User => {
                prompt.push_str("[INST] ");
                if !system_prompt.is_empty() {
                    prompt.push_str("<<SYS>>\n");
                    prompt.push_str(&system_prompt);
                    prompt.push_str("\n<</SYS>>\n\n");
                    system_prompt.clear();
                }
                prompt.push_str(&msg.content);
                prompt.push_str(" [/INST]");
            }
            Role::Assistant => {
                prompt.push(' ');
                prompt.push_str(&msg.content);
                prompt.push_str(" </s>");
            }
        }
    }
    prompt
}

fn render_chatml(messages: &[Message]) -> String {
    let mut prompt = String::new();
    for msg in messages {
        prompt.push_str("<|im_start|>");
        prompt.push_str(role_name(msg.role));
        prompt.push('\n');
        prompt.push_str(&msg.content);
        prompt.push_str("<|im_end|>\n");
    }
    prompt.push_str("<|im_start|>assistant\n");
    prompt
}

fn render_tinyllama(messages: &[Message]) -> String {
    let mut prompt = String::new();
    for msg in messages {
        prompt.push_str("<|");
        prompt.push_str(role_name(msg.role));
        prompt.push_str("|>\n");
        prompt.push_str(&msg.content);
        prompt.push_str("</s>\n");
    }
    prompt.push_str("<|assistant|>\n");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_tags() {
        assert_eq!(TemplateTag::parse("llama-3"), Some(TemplateTag::Llama3));
        assert_eq!(TemplateTag::parse("LLAMA3"), Some(TemplateTag::Llama3));
        assert_eq!(TemplateTag::parse("chatml"), Some(TemplateTag::ChatMl));
        assert_eq!(TemplateTag::parse(" tinyllama "), Some(TemplateTag::TinyLlama));
        assert_eq!(TemplateTag::parse("alpaca"), None);
    }

    #[test]
    fn template_llama3() {
        let messages = vec![Message::user("Hello")];
        let prompt = render_llama3(&messages);
        assert!(prompt.starts_with("<|begin_of_text|>"));
        assert!(prompt.contains("<|start_header_id|>user<|end_header_id|>"));
        assert!(prompt.contains("Hello"));
        assert!(prompt.ends_with("<|start_header_id|>assistant<|end_header_id|>\n\n"));
    }

    #[test]
    fn template_llama2() {
        let messages = vec![Message::system("Be helpful."), Message::user("Question")];
        let prompt = render_llama2(&messages);
        assert!(prompt.contains("<<SYS>>"));
        assert!(prompt.contains("Be helpful."));
        assert!(prompt.contains("[INST]"));
        assert!(prompt.contains("Question"));
    }

    #[test]
    fn template_chatml() {
        let messages = vec![Message::system("You are helpful."), Message::user("Hi")];
        let prompt = render_chatml(&messages);
        assert!(prompt.contains("<|im_start|>system"));
        assert!(prompt.contains("<|im_start|>user"));
        assert!(prompt.ends_with("<|im_start|>assistant\n"));
    }

    #[test]
    fn template_tinyllama() {
        let messages = vec![Message::user("Hello!")];
        let prompt = render_tinyllama(&messages);
        assert!(prompt.contains("<|user|>"));
        assert!(prompt.contains("Hello!"));
        assert!(prompt.ends_with("<|assistant|>\n"));
    }

    #[test]
    fn assistant_turns_round_trip_through_templates() {
        let messages = vec![
            Message::user("hi"),
            Message::assistant("hello!"),
            Message::user("bye"),
        ];
        for tag in [
            TemplateTag::Llama3,
            TemplateTag::Llama2,
            TemplateTag::ChatMl,
            TemplateTag::TinyLlama,
        ] {
            let prompt = tag.render(&messages);
            assert!(prompt.contains("hello!"), "{} lost a turn", tag.name());
            assert!(prompt.contains("bye"), "{} lost a turn", tag.name());
        }
    }
}
