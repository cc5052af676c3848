//! Grok (xAI) adapter
//!
//! OpenAI-compatible wire shape against a different host; the payload and
//! response handling come from the `openai` module.

use async_trait::async_trait;
use reqwest::Client;

use crate::backends::{self, Backend};
use crate::config::AdapterConfig;
use crate::error::{ConfigWarning, RouterError};
use crate::routing::{BackendDescriptor, DEFAULT_REMOTE_CEILING};
use crate::work::GenerationRequest;

use super::openai::{call_chat_completions, chat_payload};

pub(super) static DESCRIPTOR: BackendDescriptor =
    BackendDescriptor::remote("grok", DEFAULT_REMOTE_CEILING).streaming();

const DEFAULT_BASE_URL: &str = "https://api.x.ai/v1";
const DEFAULT_MODEL: &str = "grok-beta";

pub struct GrokAdapter {
    client: Client,
}

impl GrokAdapter {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

impl Default for GrokAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend<GenerationRequest> for GrokAdapter {
    fn descriptor(&self) -> &'static BackendDescriptor {
        &DESCRIPTOR
    }

    fn defaults(&self) -> AdapterConfig {
        AdapterConfig::new()
            .with("model", DEFAULT_MODEL)
            .with("temperature", 0.7)
            .with("max_tokens", 1000)
            .with("top_p", 1.0)
            .with("base_url", DEFAULT_BASE_URL)
    }

    fn validate(&self, config: &mut AdapterConfig) -> Vec<ConfigWarning> {
        backends::resolve_api_key("grok", config).into_iter().collect()
    }

    async fn execute(
        &self,
        item: &GenerationRequest,
        config: &AdapterConfig,
    ) -> Result<String, RouterError> {
        let api_key = backends::require_api_key("grok", config)?;
        let base_url = config.get_str("base_url").unwrap_or(DEFAULT_BASE_URL);
        let payload = chat_payload(item, config, DEFAULT_MODEL);

        call_chat_completions(
            &self.client,
            "grok",
            base_url,
            api_key,
            &payload,
            backends::request_timeout(config),
        )
        .await
    }
}
