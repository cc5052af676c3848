//! AssemblyAI adapter
//!
//! Three-step workflow: upload the audio bytes, submit a transcript job for
//! the returned URL, then poll until the job completes or errors. The poll
//! cadence and deadline are configurable.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::time::Instant;

use crate::backends::{self, Backend};
use crate::config::AdapterConfig;
use crate::error::{ConfigWarning, RouterError};
use crate::routing::{BackendDescriptor, DEFAULT_REMOTE_CEILING};
use crate::work::TranscriptionRequest;

pub(super) static DESCRIPTOR: BackendDescriptor =
    BackendDescriptor::remote("assemblyai", DEFAULT_REMOTE_CEILING);

const DEFAULT_BASE_URL: &str = "https://api.assemblyai.com/v2";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 3;
const DEFAULT_POLL_TIMEOUT_SECS: u64 = 300;

pub struct AssemblyAiAdapter {
    client: Client,
}

impl AssemblyAiAdapter {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

impl Default for AssemblyAiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend<TranscriptionRequest> for AssemblyAiAdapter {
    fn descriptor(&self) -> &'static BackendDescriptor {
        &DESCRIPTOR
    }

    fn defaults(&self) -> AdapterConfig {
        AdapterConfig::new()
            .with("language_code", "en")
            .with("speaker_labels", false)
            .with("poll_interval_secs", DEFAULT_POLL_INTERVAL_SECS)
            .with("poll_timeout_secs", DEFAULT_POLL_TIMEOUT_SECS)
    }

    fn validate(&self, config: &mut AdapterConfig) -> Vec<ConfigWarning> {
        backends::resolve_api_key("assemblyai", config).into_iter().collect()
    }

    async fn execute(
        &self,
        item: &TranscriptionRequest,
        config: &AdapterConfig,
    ) -> Result<String, RouterError> {
        let api_key = backends::require_api_key("assemblyai", config)?.to_string();
        let bytes = backends::read_source("assemblyai", &item.source).await?;
        let base_url = config
            .get_str("base_url")
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string();
        let timeout = backends::request_timeout(config);

        let upload_url = self
            .upload(&base_url, &api_key, bytes, timeout)
            .await?;
        let mut transcript = self
            .submit(&base_url, &api_key, &upload_url, config, timeout)
            .await?;

        tracing::debug!(id = %transcript.id, "transcript job submitted");

        let interval = Duration::from_secs(poll_interval_secs(config));
        let deadline = Instant::now() + Duration::from_secs(poll_timeout_secs(config));

        loop {
            match transcript.status.as_str() {
                "completed" => {
                    return transcript.text.ok_or_else(|| {
                        RouterError::execution("assemblyai", "completed transcript carried no text")
                    });
                }
                "error" => {
                    let reason = transcript
                        .error
                        .unwrap_or_else(|| "unknown transcription error".to_string());
                    return Err(RouterError::execution("assemblyai", reason));
                }
                _ => {}
            }

            if Instant::now() >= deadline {
                return Err(RouterError::execution(
                    "assemblyai",
                    format!(
                        "transcript {} still '{}' after {}s",
                        transcript.id,
                        transcript.status,
                        poll_timeout_secs(config)
                    ),
                ));
            }

            tokio::time::sleep(interval).await;
            transcript = self
                .poll(&base_url, &api_key, &transcript.id, timeout)
                .await?;
        }
    }
}

impl AssemblyAiAdapter {
    async fn upload(
        &self,
        base_url: &str,
        api_key: &str,
        bytes: Vec<u8>,
        timeout: Duration,
    ) -> Result<String, RouterError> {
        tracing::debug!(bytes = bytes.len(), "uploading audio to AssemblyAI");

        let response = self
            .client
            .post(format!("{}/upload", base_url))
            .timeout(timeout)
            .header("authorization", api_key)
            .body(bytes)
            .send()
            .await
            .map_err(|err| RouterError::execution("assemblyai", err))?;

        let body: UploadResponse = backends::expect_json("assemblyai", response).await?;
        Ok(body.upload_url)
    }

    async fn submit(
        &self,
        base_url: &str,
        api_key: &str,
        upload_url: &str,
        config: &AdapterConfig,
        timeout: Duration,
    ) -> Result<Transcript, RouterError> {
        let response = self
            .client
            .post(format!("{}/transcript", base_url))
            .timeout(timeout)
            .header("authorization", api_key)
            .json(&submit_payload(upload_url, config))
            .send()
            .await
            .map_err(|err| RouterError::execution("assemblyai", err))?;

        backends::expect_json("assemblyai", response).await
    }

    async fn poll(
        &self,
        base_url: &str,
        api_key: &str,
        id: &str,
        timeout: Duration,
    ) -> Result<Transcript, RouterError> {
        let response = self
            .client
            .get(format!("{}/transcript/{}", base_url, id))
            .timeout(timeout)
            .header("authorization", api_key)
            .send()
            .await
            .map_err(|err| RouterError::execution("assemblyai", err))?;

        backends::expect_json("assemblyai", response).await
    }
}

fn submit_payload(upload_url: &str, config: &AdapterConfig) -> Value {
    json!({
        "audio_url": upload_url,
        "language_code": config.get_str("language_code").unwrap_or("en"),
        "speaker_labels": config.get_bool("speaker_labels").unwrap_or(false),
    })
}

/// Poll cadence, clamped to at least one second.
fn poll_interval_secs(config: &AdapterConfig) -> u64 {
    config
        .get_u64("poll_interval_secs")
        .unwrap_or(DEFAULT_POLL_INTERVAL_SECS)
        .max(1)
}

fn poll_timeout_secs(config: &AdapterConfig) -> u64 {
    config
        .get_u64("poll_timeout_secs")
        .unwrap_or(DEFAULT_POLL_TIMEOUT_SECS)
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    upload_url: String,
}

#[derive(Debug, Deserialize)]
struct Transcript {
    id: String,
    status: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    error: Option<String>,
}
