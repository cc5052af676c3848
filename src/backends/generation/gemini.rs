//! Gemini adapter
//!
//! generateContent-style JSON API. System instructions are folded ahead of
//! the prompt; sampling keys are renamed to the camelCase `generationConfig`
//! fields on the wire.

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
    BackendDescriptor::remote("gemini", DEFAULT_REMOTE_CEILING).streaming();

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-pro";

/// Config key to wire-field renames for `generationConfig`.
const GENERATION_KEYS: [(&str, &str); 4] = [
    ("temperature", "temperature"),
    ("top_p", "topP"),
    ("top_k", "topK"),
    ("max_tokens", "maxOutputTokens"),
];

pub struct GeminiAdapter {
    client: Client,
}

impl GeminiAdapter {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

impl Default for GeminiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend<GenerationRequest> for GeminiAdapter {
    fn descriptor(&self) -> &'static BackendDescriptor {
        &DESCRIPTOR
    }

    fn defaults(&self) -> AdapterConfig {
        AdapterConfig::new()
            .with("model", DEFAULT_MODEL)
            .with("temperature", 0.7)
            .with("max_tokens", 1000)
            .with("top_p", 0.95)
            .with("top_k", 40)
    }

    fn validate(&self, config: &mut AdapterConfig) -> Vec<ConfigWarning> {
        backends::resolve_api_key("gemini", config).into_iter().collect()
    }

    async fn execute(
        &self,
        item: &GenerationRequest,
        config: &AdapterConfig,
    ) -> Result<String, RouterError> {
        let api_key = backends::require_api_key("gemini", config)?;
        let base_url = config.get_str("base_url").unwrap_or(DEFAULT_BASE_URL);
        let url = format!(
            "{}/models/{}:generateContent",
            base_url.trim_end_matches('/'),
            super::model_name(item, config, DEFAULT_MODEL)
        );
        let payload = generate_payload(item, config);

        tracing::debug!(url = %url, "calling Gemini generateContent endpoint");

        let response = self
            .client
            .post(&url)
            .timeout(backends::request_timeout(config))
            .header("x-goog-api-key", api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|err| RouterError::execution("gemini", err))?;

        let body: GenerateResponse = backends::expect_json("gemini", response).await?;
        candidate_text(body)
    }
}

fn generate_payload(item: &GenerationRequest, config: &AdapterConfig) -> Value {
    let mut generation_config = Map::new();
    for (key, wire_key) in GENERATION_KEYS {
        if let Some(value) = param(item, config, key) {
            generation_config.insert(wire_key.to_string(), value.clone());
        }
    }

    json!({
        "contents": [{"parts": [{"text": full_prompt(item)}]}],
        "generationConfig": generation_config,
    })
}

fn full_prompt(item: &GenerationRequest) -> String {
    match &item.system {
        Some(system) => format!("{}\n\n{}", system, item.prompt),
        None => item.prompt.clone(),
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

/// Join the first candidate's text parts. A response with no candidate at
/// all is a blocked or failed generation, not an empty one.
fn candidate_text(body: GenerateResponse) -> Result<String, RouterError> {
    let candidate = body
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| RouterError::execution("gemini", "response carried no candidates"))?;

    Ok(candidate
        .content
        .parts
        .into_iter()
        .filter_map(|part| part.text)
        .collect::<Vec<_>>()
        .join(""))
}
