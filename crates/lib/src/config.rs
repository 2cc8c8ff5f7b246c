//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.learner/config.json`) and environment.
//! Nothing is ever written back: the API key in particular stays in the session.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Completion endpoint settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Attached document settings.
    #[serde(default)]
    pub attachment: AttachmentConfig,
}

/// Hosted chat-completion endpoint (OpenRouter or any OpenAI-compatible server).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Full URL of the chat completions endpoint.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model id sent with every request.
    #[serde(default = "default_model")]
    pub model: String,

    /// Optional API key used to seed new sessions. Overridden by OPENROUTER_API_KEY env.
    #[serde(default)]
    pub api_key: Option<String>,

    /// When true, transport and decode failures shown in the chat carry a captured backtrace
    /// after the error chain.
    #[serde(default = "default_include_backtrace")]
    pub include_backtrace: bool,
}

/// Limits applied to text extracted from an attached document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentConfig {
    /// Characters of extracted text folded into a message before truncation (default 3000).
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

pub const DEFAULT_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "google/gemma-3n-e4b-it:free";
pub const DEFAULT_MAX_CHARS: usize = 3000;

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_include_backtrace() -> bool {
    true
}

fn default_max_chars() -> usize {
    DEFAULT_MAX_CHARS
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            api_key: None,
            include_backtrace: default_include_backtrace(),
        }
    }
}

impl Default for AttachmentConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
        }
    }
}

/// Resolve the API key a new session starts with: env OPENROUTER_API_KEY overrides config.
pub fn resolve_api_key(config: &Config) -> Option<String> {
    pick_api_key(std::env::var("OPENROUTER_API_KEY").ok(), config)
}

fn pick_api_key(env_value: Option<String>, config: &Config) -> Option<String> {
    non_blank(env_value).or_else(|| non_blank(config.gateway.api_key.clone()))
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("LEARNER_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".learner").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the given path, else LEARNER_CONFIG_PATH, else the default path.
/// Missing file => default config. Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_openrouter() {
        let c = Config::default();
        assert_eq!(c.gateway.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(c.gateway.model, DEFAULT_MODEL);
        assert!(c.gateway.include_backtrace);
        assert_eq!(c.attachment.max_chars, 3000);
    }

    #[test]
    fn partial_json_keeps_remaining_defaults() {
        let c: Config =
            serde_json::from_str(r#"{"gateway":{"model":"local/test"},"attachment":{"maxChars":10}}"#)
                .unwrap();
        assert_eq!(c.gateway.model, "local/test");
        assert_eq!(c.gateway.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(c.attachment.max_chars, 10);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let path = std::env::temp_dir()
            .join(format!("learner-missing-{}", uuid::Uuid::new_v4()))
            .join("config.json");
        let (c, used) = load_config(Some(path.clone())).unwrap();
        assert_eq!(used, path);
        assert_eq!(c.gateway.model, DEFAULT_MODEL);
    }

    #[test]
    fn invalid_json_is_an_error() {
        let dir = std::env::temp_dir().join(format!("learner-config-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = load_config(Some(path)).unwrap_err();
        assert!(format!("{:#}", err).contains("parsing config"));
    }

    #[test]
    fn config_api_key_is_trimmed_and_blank_ignored() {
        let mut c = Config::default();
        c.gateway.api_key = Some("   ".to_string());
        assert_eq!(non_blank(c.gateway.api_key.clone()), None);
        c.gateway.api_key = Some("  sk-or-1 ".to_string());
        assert_eq!(non_blank(c.gateway.api_key.clone()), Some("sk-or-1".to_string()));
    }

    #[test]
    fn env_api_key_overrides_config() {
        let c: Config =
            serde_json::from_str(r#"{"gateway":{"apiKey":"sk-from-file"}}"#).unwrap();
        assert_eq!(
            pick_api_key(Some(" sk-from-env ".to_string()), &c),
            Some("sk-from-env".to_string())
        );
        assert_eq!(
            pick_api_key(Some("  ".to_string()), &c),
            Some("sk-from-file".to_string())
        );
        assert_eq!(pick_api_key(None, &c), Some("sk-from-file".to_string()));
        assert_eq!(pick_api_key(None, &Config::default()), None);
    }
}
