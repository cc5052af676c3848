//! ElevenLabs adapter
//!
//! Speech-to-text over a multipart POST; the file travels in the `audio`
//! field and the transcript comes back in `text`.

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
    BackendDescriptor::remote("elevenlabs", DEFAULT_REMOTE_CEILING);

const DEFAULT_BASE_URL: &str = "https://api.elevenlabs.io/v1";

pub struct ElevenLabsAdapter {
    client: Client,
}

impl ElevenLabsAdapter {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

impl Default for ElevenLabsAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend<TranscriptionRequest> for ElevenLabsAdapter {
    fn descriptor(&self) -> &'static BackendDescriptor {
        &DESCRIPTOR
    }

    fn validate(&self, config: &mut AdapterConfig) -> Vec<ConfigWarning> {
        backends::resolve_api_key("elevenlabs", config).into_iter().collect()
    }

    async fn execute(
        &self,
        item: &TranscriptionRequest,
        config: &AdapterConfig,
    ) -> Result<String, RouterError> {
        let api_key = backends::require_api_key("elevenlabs", config)?.to_string();
        let bytes = backends::read_source("elevenlabs", &item.source).await?;
        let base_url = config.get_str("base_url").unwrap_or(DEFAULT_BASE_URL);
        let url = format!("{}/speech-to-text", base_url.trim_end_matches('/'));

        let form = Form::new().part(
            "audio",
            Part::bytes(bytes).file_name(super::audio_part_name(&item.source)),
        );

        tracing::debug!(url = %url, "posting audio to ElevenLabs");

        let response = self
            .client
            .post(&url)
            .timeout(backends::request_timeout(config))
            .header("xi-api-key", api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|err| RouterError::execution("elevenlabs", err))?;

        let body: SpeechToTextResponse = backends::expect_json("elevenlabs", response).await?;
        Ok(body.text)
    }
}

#[derive(Debug, Deserialize)]
struct SpeechToTextResponse {
    #[serde(default)]
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_tolerates_a_missing_text_field() {
        let body: SpeechToTextResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(body.text, "");

        let full: SpeechToTextResponse =
            serde_json::from_str(r#"{"text": "dictation"}"#).unwrap();
        assert_eq!(full.text, "dictation");
    }

    #[test]
    fn test_missing_credential_names_the_env_key() {
        let err = backends::require_api_key("elevenlabs", &AdapterConfig::new()).unwrap_err();
        assert!(err.to_string().contains("ELEVENLABS_API_KEY"));
    }
}
