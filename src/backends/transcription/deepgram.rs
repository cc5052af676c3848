//! Deepgram adapter
//!
//! Pre-recorded transcription: the audio bytes are POSTed directly to the
//! listen endpoint with the options in the query string.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::backends::{self, Backend};
use crate::config::AdapterConfig;
use crate::error::{ConfigWarning, RouterError};
use crate::routing::{BackendDescriptor, DEFAULT_REMOTE_CEILING};
use crate::work::TranscriptionRequest;

pub(super) static DESCRIPTOR: BackendDescriptor =
    BackendDescriptor::remote("deepgram", DEFAULT_REMOTE_CEILING);

const DEFAULT_BASE_URL: &str = "https://api.deepgram.com/v1";
const DEFAULT_MODEL: &str = "nova-2";

pub struct DeepgramAdapter {
    client: Client,
}

impl DeepgramAdapter {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

impl Default for DeepgramAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend<TranscriptionRequest> for DeepgramAdapter {
    fn descriptor(&self) -> &'static BackendDescriptor {
        &DESCRIPTOR
    }

    fn defaults(&self) -> AdapterConfig {
        AdapterConfig::new()
            .with("model", DEFAULT_MODEL)
            .with("language", "en")
            .with("smart_format", true)
    }

    fn validate(&self, config: &mut AdapterConfig) -> Vec<ConfigWarning> {
        backends::resolve_api_key("deepgram", config).into_iter().collect()
    }

    async fn execute(
        &self,
        item: &TranscriptionRequest,
        config: &AdapterConfig,
    ) -> Result<String, RouterError> {
        let api_key = backends::require_api_key("deepgram", config)?.to_string();
        let bytes = backends::read_source("deepgram", &item.source).await?;
        let base_url = config.get_str("base_url").unwrap_or(DEFAULT_BASE_URL);
        let url = listen_url(base_url, config);

        tracing::debug!(url = %url, bytes = bytes.len(), "posting audio to Deepgram");

        let response = self
            .client
            .post(&url)
            .timeout(backends::request_timeout(config))
            .header("Authorization", format!("Token {}", api_key))
            .header("Content-Type", "application/octet-stream")
            .body(bytes)
            .send()
            .await
            .map_err(|err| RouterError::execution("deepgram", err))?;

        let body: ListenResponse = backends::expect_json("deepgram", response).await?;
        first_transcript(body)
    }
}

fn listen_url(base_url: &str, config: &AdapterConfig) -> String {
    format!(
        "{}/listen?model={}&language={}&smart_format={}",
        base_url.trim_end_matches('/'),
        config.get_str("model").unwrap_or(DEFAULT_MODEL),
        config.get_str("language").unwrap_or("en"),
        config.get_bool("smart_format").unwrap_or(true),
    )
}

#[derive(Debug, Deserialize)]
struct ListenResponse {
    results: ListenResults,
}

#[derive(Debug, Deserialize)]
struct ListenResults {
    #[serde(default)]
    channels: Vec<ListenChannel>,
}

#[derive(Debug, Deserialize)]
struct ListenChannel {
    #[serde(default)]
    alternatives: Vec<ListenAlternative>,
}

#[derive(Debug, Deserialize)]
struct ListenAlternative {
    transcript: String,
}

/// First alternative of the first channel, the same slot the dashboard
/// shows for mono pre-recorded audio.
fn first_transcript(body: ListenResponse) -> Result<String, RouterError> {
    body.results
        .channels
        .into_iter()
        .next()
        .and_then(|channel| channel.alternatives.into_iter().next())
        .map(|alternative| alternative.transcript)
        .ok_or_else(|| RouterError::execution("deepgram", "response carried no transcript"))
}
