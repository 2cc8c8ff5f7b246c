//! LLM gateway: the chat-completion backend the session talks to.
//!
//! Hosted OpenRouter (OpenAI-compatible) chat completions, non-streaming only.

mod openrouter;

use crate::conversation::Role;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use openrouter::{OpenRouterClient, OpenRouterError, MISSING_CREDENTIAL_REPLY};

/// One role/content pair of the request transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role: role.as_str().to_string(),
            content: content.into(),
        }
    }
}

/// A completion backend. Always answers with text: failures are described in the reply
/// itself so the caller can store them like any other assistant turn.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(&self, credential: &str, messages: &[ChatMessage]) -> String;
}
