//! OpenAI adapter
//!
//! Chat-completions JSON API. The payload builder and response shape live
//! here and are shared with the other OpenAI-compatible backend (`grok`),
//! which only swaps the host and the default model.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::backends::{self, Backend};
use crate::config::AdapterConfig;
use crate::error::{ConfigWarning, RouterError};
use crate::routing::{BackendDescriptor, DEFAULT_REMOTE_CEILING};
use crate::work::GenerationRequest;

use super::param;

pub(super) static DESCRIPTOR: BackendDescriptor =
    BackendDescriptor::remote("openai", DEFAULT_REMOTE_CEILING).streaming();

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Sampling keys forwarded verbatim in the request body.
const SAMPLING_KEYS: [&str; 5] = [
    "temperature",
    "max_tokens",
    "top_p",
    "frequency_penalty",
    "presence_penalty",
];

pub struct OpenAiAdapter {
    client: Client,
}

impl OpenAiAdapter {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

impl Default for OpenAiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend<GenerationRequest> for OpenAiAdapter {
    fn descriptor(&self) -> &'static BackendDescriptor {
        &DESCRIPTOR
    }

    fn defaults(&self) -> AdapterConfig {
        AdapterConfig::new()
            .with("model", DEFAULT_MODEL)
            .with("temperature", 0.7)
            .with("max_tokens", 1000)
            .with("top_p", 1.0)
            .with("frequency_penalty", 0.0)
            .with("presence_penalty", 0.0)
    }

    fn validate(&self, config: &mut AdapterConfig) -> Vec<ConfigWarning> {
        backends::resolve_api_key("openai", config).into_iter().collect()
    }

    async fn execute(
        &self,
        item: &GenerationRequest,
        config: &AdapterConfig,
    ) -> Result<String, RouterError> {
        let api_key = backends::require_api_key("openai", config)?;
        let base_url = config.get_str("base_url").unwrap_or(DEFAULT_BASE_URL);
        let payload = chat_payload(item, config, DEFAULT_MODEL);

        call_chat_completions(
            &self.client,
            "openai",
            base_url,
            api_key,
            &payload,
            backends::request_timeout(config),
        )
        .await
    }
}

// ============================================================================
// Shared chat-completions wire pieces
// ============================================================================

/// Chat-completions request body used by every OpenAI-compatible backend.
pub(super) fn chat_payload(
    item: &GenerationRequest,
    config: &AdapterConfig,
    fallback_model: &str,
) -> Value {
    let mut messages = Vec::new();
    if let Some(system) = &item.system {
        messages.push(json!({"role": "system", "content": system}));
    }
    messages.push(json!({"role": "user", "content": item.prompt}));

    let mut payload = Map::new();
    payload.insert(
        "model".to_string(),
        Value::String(super::model_name(item, config, fallback_model)),
    );
    payload.insert("messages".to_string(), Value::Array(messages));
    for key in SAMPLING_KEYS {
        if let Some(value) = param(item, config, key) {
            payload.insert(key.to_string(), value.clone());
        }
    }
    Value::Object(payload)
}

/// POST the payload and pull the first choice's text out of the response.
pub(super) async fn call_chat_completions(
    client: &Client,
    backend: &'static str,
    base_url: &str,
    api_key: &str,
    payload: &Value,
    timeout: Duration,
) -> Result<String, RouterError> {
    let url = format!("{}/chat/completions", base_url.trim_end_matches('/'));

    tracing::debug!(backend, url = %url, "calling chat completions endpoint");

    let response = client
        .post(&url)
        .timeout(timeout)
        .bearer_auth(api_key)
        .json(payload)
        .send()
        .await
        .map_err(|err| RouterError::execution(backend, err))?;

    let body: ChatResponse = backends::expect_json(backend, response).await?;
    first_choice_text(backend, body)
}

#[derive(Debug, Deserialize)]
pub(super) struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatTurn,
}

#[derive(Debug, Deserialize)]
struct ChatTurn {
    content: Option<String>,
}

fn first_choice_text(backend: &'static str, body: ChatResponse) -> Result<String, RouterError> {
    body.choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|text| text.trim().to_string())
        .ok_or_else(|| RouterError::execution(backend, "response carried no choices"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_payload_shape() {
        let adapter = OpenAiAdapter::new();
        let config = adapter.defaults();
        let item = GenerationRequest::new("summarize this").with_system("you are brief");

        let payload = chat_payload(&item, &config, DEFAULT_MODEL);

        assert_eq!(payload["model"], "gpt-3.5-turbo");
        assert_eq!(payload["messages"][0]["role"], "system");
        assert_eq!(payload["messages"][0]["content"], "you are brief");
        assert_eq!(payload["messages"][1]["role"], "user");
        assert_eq!(payload["messages"][1]["content"], "summarize this");
        assert_eq!(payload["temperature"], 0.7);
        assert_eq!(payload["max_tokens"], 1000);
        assert_eq!(payload["presence_penalty"], 0.0);
    }

    #[test]
    fn test_chat_payload_without_system_has_single_message() {
        let adapter = OpenAiAdapter::new();
        let payload = chat_payload(
            &GenerationRequest::new("hi"),
            &adapter.defaults(),
            DEFAULT_MODEL,
        );
        assert_eq!(payload["messages"].as_array().unwrap().len(), 1);
        assert_eq!(payload["messages"][0]["role"], "user");
    }

    #[test]
    fn test_per_call_params_take_precedence() {
        let adapter = OpenAiAdapter::new();
        let config = adapter.defaults();
        let item = GenerationRequest::new("x")
            .with_param("model", "gpt-4")
            .with_param("max_tokens", 32);

        let payload = chat_payload(&item, &config, DEFAULT_MODEL);

        assert_eq!(payload["model"], "gpt-4");
        assert_eq!(payload["max_tokens"], 32);
    }

    #[test]
    fn test_first_choice_text_trims_and_rejects_empty_choices() {
        let body: ChatResponse = serde_json::from_value(json!({
            "choices": [{"message": {"role": "assistant", "content": "  hello  "}}]
        }))
        .unwrap();
        assert_eq!(first_choice_text("openai", body).unwrap(), "hello");

        let empty: ChatResponse = serde_json::from_value(json!({"choices": []})).unwrap();
        assert!(first_choice_text("openai", empty).is_err());
    }

    #[test]
    fn test_missing_credential_names_the_env_key() {
        let err = backends::require_api_key("openai", &AdapterConfig::new()).unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }
}
