//! Ollama adapter
//!
//! Talks to a local model daemon over loopback HTTP. The model occupies
//! local compute, so the descriptor pins the ceiling to one and requests
//! serialize through the gate. No credential.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::backends::{self, Backend};
use crate::config::AdapterConfig;
use crate::error::{ConfigWarning, RouterError};
use crate::routing::BackendDescriptor;
use crate::work::GenerationRequest;

use super::param;

pub(super) static DESCRIPTOR: BackendDescriptor = BackendDescriptor::local("ollama").streaming();

const DEFAULT_HOST: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "llama2";

/// Sampling keys forwarded to the daemon's `options` object.
const OPTION_KEYS: [&str; 5] = [
    "temperature",
    "top_p",
    "top_k",
    "num_predict",
    "repeat_penalty",
];

pub struct OllamaAdapter {
    client: Client,
}

impl OllamaAdapter {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

impl Default for OllamaAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend<GenerationRequest> for OllamaAdapter {
    fn descriptor(&self) -> &'static BackendDescriptor {
        &DESCRIPTOR
    }

    fn defaults(&self) -> AdapterConfig {
        AdapterConfig::new()
            .with("model", DEFAULT_MODEL)
            .with("host", DEFAULT_HOST)
            .with("temperature", 0.7)
            .with("top_p", 0.9)
            .with("top_k", 40)
            .with("num_predict", 1000)
            .with("repeat_penalty", 1.1)
    }

    // Connectivity is not probed; an unreachable daemon surfaces at execute
    // time with a run hint.
    fn validate(&self, _config: &mut AdapterConfig) -> Vec<ConfigWarning> {
        Vec::new()
    }

    async fn execute(
        &self,
        item: &GenerationRequest,
        config: &AdapterConfig,
    ) -> Result<String, RouterError> {
        let host = config.get_str("host").unwrap_or(DEFAULT_HOST).to_string();
        let url = format!("{}/api/generate", host.trim_end_matches('/'));
        let payload = generate_payload(item, config);

        tracing::debug!(url = %url, "calling Ollama generate endpoint");

        let response = self
            .client
            .post(&url)
            .timeout(backends::request_timeout(config))
            .json(&payload)
            .send()
            .await
            .map_err(|err| connect_error(&host, err))?;

        let body: GenerateResponse = backends::expect_json("ollama", response).await?;
        Ok(body.response)
    }
}

/// Non-streaming generate request body. Per-call parameters take precedence
/// over the instance config for the model and every sampling option.
fn generate_payload(item: &GenerationRequest, config: &AdapterConfig) -> Value {
    let mut options = Map::new();
    for key in OPTION_KEYS {
        if let Some(value) = param(item, config, key) {
            options.insert(key.to_string(), value.clone());
        }
    }

    json!({
        "model": super::model_name(item, config, DEFAULT_MODEL),
        "prompt": full_prompt(item),
        "stream": false,
        "options": options,
    })
}

fn full_prompt(item: &GenerationRequest) -> String {
    match &item.system {
        Some(system) => format!("System: {}\n\nUser: {}", system, item.prompt),
        None => item.prompt.clone(),
    }
}

fn connect_error(host: &str, err: reqwest::Error) -> RouterError {
    if err.is_connect() {
        return RouterError::execution(
            "ollama",
            format!(
                "could not connect to {}. Make sure Ollama is running (start it with `ollama serve`)",
                host
            ),
        );
    }
    RouterError::execution("ollama", err)
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}
