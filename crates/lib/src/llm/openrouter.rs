//! OpenRouter client (https://openrouter.ai/api/v1/chat/completions by default).
//! Any OpenAI-compatible chat completions endpoint works; streaming is not used.

use super::{ChatBackend, ChatMessage};
use crate::config::GatewayConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::backtrace::Backtrace;
use std::error::Error as _;

/// Reply used when no API key has been entered. No request is sent in that case.
pub const MISSING_CREDENTIAL_REPLY: &str =
    "Error: Please enter your OpenRouter API key in the sidebar.";

/// Client for a hosted chat completions endpoint, authenticated with a bearer key.
#[derive(Clone)]
pub struct OpenRouterClient {
    endpoint: String,
    model: String,
    include_backtrace: bool,
    client: reqwest::Client,
}

#[derive(Debug, thiserror::Error)]
pub enum OpenRouterError {
    #[error("missing api key")]
    MissingCredential,
    #[error("openrouter request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("{status} - {body}")]
    Api { status: u16, body: String },
    #[error("openrouter response is not valid json: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("openrouter response has no choices[0].message.content")]
    MissingContent,
}

impl OpenRouterClient {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            model: model.into(),
            include_backtrace: true,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(config.endpoint.trim(), config.model.trim())
            .with_backtrace(config.include_backtrace)
    }

    /// Whether failure replies end with a captured backtrace after the error chain.
    pub fn with_backtrace(mut self, include: bool) -> Self {
        self.include_backtrace = include;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// POST the transcript and return `choices[0].message.content` unchanged.
    /// Any status other than 200 is an error carrying the raw body.
    pub async fn try_complete(
        &self,
        credential: &str,
        messages: &[ChatMessage],
    ) -> Result<String, OpenRouterError> {
        let credential = credential.trim();
        if credential.is_empty() {
            return Err(OpenRouterError::MissingCredential);
        }
        let body = ChatRequest {
            model: &self.model,
            messages,
        };
        log::info!(
            "completion request: model={} messages={}",
            self.model,
            messages.len()
        );
        let res = self
            .client
            .post(&self.endpoint)
            .bearer_auth(credential)
            .json(&body)
            .send()
            .await?;
        let status = res.status();
        let text = res.text().await?;
        if status != reqwest::StatusCode::OK {
            return Err(OpenRouterError::Api {
                status: status.as_u16(),
                body: text,
            });
        }
        let data: ChatResponse = serde_json::from_str(&text)?;
        data.choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .ok_or(OpenRouterError::MissingContent)
    }

    /// Turn a failed request into the text shown as the assistant's reply.
    fn failure_reply(&self, err: &OpenRouterError) -> String {
        match err {
            OpenRouterError::MissingCredential => MISSING_CREDENTIAL_REPLY.to_string(),
            OpenRouterError::Api { .. } => format!("Error: {}", err),
            _ => {
                let mut trace = format!("{:?}", err);
                let mut source = err.source();
                while let Some(cause) = source {
                    trace.push_str(&format!("\ncaused by: {}", cause));
                    source = cause.source();
                }
                if self.include_backtrace {
                    trace.push('\n');
                    trace.push_str(&Backtrace::force_capture().to_string());
                }
                format!("Error: {}\nTraceback:\n{}", err, trace.trim_end())
            }
        }
    }
}

#[async_trait]
impl ChatBackend for OpenRouterClient {
    async fn complete(&self, credential: &str, messages: &[ChatMessage]) -> String {
        match self.try_complete(credential, messages).await {
            Ok(reply) => reply,
            Err(e) => {
                if !matches!(e, OpenRouterError::MissingCredential) {
                    log::warn!("completion failed: {}", e);
                }
                self.failure_reply(&e)
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Role;

    #[test]
    fn request_body_replays_messages_in_order() {
        let messages = vec![
            ChatMessage::new(Role::User, "q1"),
            ChatMessage::new(Role::Assistant, "a1"),
            ChatMessage::new(Role::User, "q2"),
        ];
        let body = ChatRequest {
            model: "m",
            messages: &messages,
        };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(
            v,
            serde_json::json!({
                "model": "m",
                "messages": [
                    {"role": "user", "content": "q1"},
                    {"role": "assistant", "content": "a1"},
                    {"role": "user", "content": "q2"}
                ]
            })
        );
    }

    #[test]
    fn api_failure_reply_embeds_status_and_body() {
        let client = OpenRouterClient::new("http://unused", "m");
        let reply = client.failure_reply(&OpenRouterError::Api {
            status: 429,
            body: "slow down".to_string(),
        });
        assert_eq!(reply, "Error: 429 - slow down");
    }

    #[test]
    fn decode_failure_reply_carries_traceback() {
        let client = OpenRouterClient::new("http://unused", "m").with_backtrace(false);
        let err = serde_json::from_str::<ChatResponse>("{").unwrap_err();
        let reply = client.failure_reply(&OpenRouterError::Decode(err));
        assert!(reply.starts_with("Error: openrouter response is not valid json"));
        assert!(reply.contains("\nTraceback:\n"));
        assert!(reply.contains("caused by:"));
    }

    #[test]
    fn from_config_uses_endpoint_and_model() {
        let mut cfg = GatewayConfig::default();
        cfg.endpoint = " http://localhost:9/v1/chat/completions ".to_string();
        cfg.model = "tiny".to_string();
        let client = OpenRouterClient::from_config(&cfg);
        assert_eq!(client.endpoint(), "http://localhost:9/v1/chat/completions");
        assert_eq!(client.model(), "tiny");
    }
}
