//! Together AI adapter
//!
//! OpenAI-compatible multipart transcription endpoint running hosted
//! Whisper models.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;

use crate::backends::{self, Backend};
use crate::config::AdapterConfig;
use crate::error::{ConfigWarning, RouterError};
use crate::routing::{BackendDescriptor, DEFAULT_REMOTE_CEILING};
use crate::work::TranscriptionRequest;

pub(super) static DESCRIPTOR: BackendDescriptor =
    BackendDescriptor::remote("togetherai", DEFAULT_REMOTE_CEILING);

const DEFAULT_BASE_URL: &str = "https://api.together.xyz/v1";
const DEFAULT_MODEL: &str = "whisper-large-v3";

pub struct TogetherAiAdapter {
    client: Client,
}

impl TogetherAiAdapter {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

impl Default for TogetherAiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend<TranscriptionRequest> for TogetherAiAdapter {
    fn descriptor(&self) -> &'static BackendDescriptor {
        &DESCRIPTOR
    }

    fn defaults(&self) -> AdapterConfig {
        AdapterConfig::new()
            .with("model", DEFAULT_MODEL)
            .with("language", "en")
    }

    fn validate(&self, config: &mut AdapterConfig) -> Vec<ConfigWarning> {
        backends::resolve_api_key("togetherai", config).into_iter().collect()
    }

    async fn execute(
        &self,
        item: &TranscriptionRequest,
        config: &AdapterConfig,
    ) -> Result<String, RouterError> {
        let api_key = backends::require_api_key("togetherai", config)?.to_string();
        let bytes = backends::read_source("togetherai", &item.source).await?;
        let base_url = config.get_str("base_url").unwrap_or(DEFAULT_BASE_URL);
        let url = format!("{}/audio/transcriptions", base_url.trim_end_matches('/'));

        let form = Form::new()
            .part(
                "file",
                Part::bytes(bytes).file_name(super::audio_part_name(&item.source)),
            )
            .text(
                "model",
                config.get_str("model").unwrap_or(DEFAULT_MODEL).to_string(),
            )
            .text(
                "language",
                config.get_str("language").unwrap_or("en").to_string(),
            );

        tracing::debug!(url = %url, "posting audio to Together AI");

        let response = self
            .client
            .post(&url)
            .timeout(backends::request_timeout(config))
            .bearer_auth(api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|err| RouterError::execution("togetherai", err))?;

        let body: TranscriptionResponse = backends::expect_json("togetherai", response).await?;
        Ok(body.text)
    }
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_pick_a_hosted_whisper_model() {
        let adapter = TogetherAiAdapter::new();
        let config = adapter.defaults();
        assert_eq!(config.get_str("model"), Some("whisper-large-v3"));
        assert_eq!(config.get_str("language"), Some("en"));
    }

    #[test]
    fn test_response_decodes_the_text_field() {
        let body: TranscriptionResponse =
            serde_json::from_str(r#"{"text": "hello from the tape"}"#).unwrap();
        assert_eq!(body.text, "hello from the tape");
    }

    #[test]
    fn test_missing_credential_names_the_env_key() {
        let err = backends::require_api_key("togetherai", &AdapterConfig::new()).unwrap_err();
        assert!(err.to_string().contains("TOGETHER_API_KEY"));
    }
}
