//! Text generation backends
//!
//! One registry over the four generation adapters plus the class-specific
//! surface: `generate`/`chat` aliases on the router and one-shot module
//! functions that resolve and run in a single call.

mod gemini;
mod grok;
mod ollama;
mod openai;

use std::sync::Arc;

use serde_json::Value;

use crate::config::AdapterConfig;
use crate::error::RouterError;
use crate::routing::{BackendDescriptor, Registry, RegistryEntry, Router};
use crate::work::{ChatMessage, GenerationRequest, Outcome};

use super::Backend;

/// Backend used when the caller does not name one. Local, so a fresh
/// checkout works without any credential.
pub const DEFAULT_BACKEND: &str = "ollama";

/// Router specialized to generation work items.
pub type GenerationRouter = Router<GenerationRequest>;

static ENTRIES: [RegistryEntry<GenerationRequest>; 4] = [
    RegistryEntry {
        descriptor: &ollama::DESCRIPTOR,
        build: build_ollama,
    },
    RegistryEntry {
        descriptor: &openai::DESCRIPTOR,
        build: build_openai,
    },
    RegistryEntry {
        descriptor: &gemini::DESCRIPTOR,
        build: build_gemini,
    },
    RegistryEntry {
        descriptor: &grok::DESCRIPTOR,
        build: build_grok,
    },
];

/// The generation backend registry.
pub static REGISTRY: Registry<GenerationRequest> = Registry::new(&ENTRIES);

fn build_ollama() -> Arc<dyn Backend<GenerationRequest>> {
    Arc::new(ollama::OllamaAdapter::new())
}

fn build_openai() -> Arc<dyn Backend<GenerationRequest>> {
    Arc::new(openai::OpenAiAdapter::new())
}

fn build_gemini() -> Arc<dyn Backend<GenerationRequest>> {
    Arc::new(gemini::GeminiAdapter::new())
}

fn build_grok() -> Arc<dyn Backend<GenerationRequest>> {
    Arc::new(grok::GrokAdapter::new())
}

// ============================================================================
// Module surface
// ============================================================================

/// Resolve a generation backend by name (case-insensitive).
pub fn resolve(name: &str, overrides: AdapterConfig) -> Result<GenerationRouter, RouterError> {
    REGISTRY.resolve(name, overrides)
}

/// Canonical names of the registered generation backends.
pub fn list_backends() -> Vec<&'static str> {
    REGISTRY.names()
}

/// Descriptor for `name`, constructing nothing.
pub fn describe(name: &str) -> Option<&'static BackendDescriptor> {
    REGISTRY.descriptor(name)
}

/// One-shot generation through a freshly resolved router.
pub async fn generate(
    prompt: &str,
    backend: &str,
    overrides: AdapterConfig,
) -> Result<String, RouterError> {
    resolve(backend, overrides)?
        .generate(&GenerationRequest::new(prompt))
        .await
}

/// One-shot batch generation; the returned outcomes align with `prompts`.
pub async fn generate_batch(
    prompts: &[String],
    backend: &str,
    overrides: AdapterConfig,
) -> Result<Vec<Outcome>, RouterError> {
    let items: Vec<GenerationRequest> = prompts
        .iter()
        .map(|prompt| GenerationRequest::new(prompt.as_str()))
        .collect();
    resolve(backend, overrides)?.generate_batch(&items).await
}

/// One-shot chat completion over a flattened transcript.
pub async fn chat(
    messages: &[ChatMessage],
    backend: &str,
    overrides: AdapterConfig,
) -> Result<String, RouterError> {
    resolve(backend, overrides)?.chat(messages).await
}

// ============================================================================
// Class aliases on the router
// ============================================================================

impl Router<GenerationRequest> {
    /// Generate text for one work item.
    pub async fn generate(&self, item: &GenerationRequest) -> Result<String, RouterError> {
        self.run(item).await
    }

    /// Blocking form of [`Router::generate`]; refuses to run inside an
    /// async runtime.
    pub fn generate_blocking(&self, item: &GenerationRequest) -> Result<String, RouterError> {
        self.run_blocking(item)
    }

    /// Run a batch of prompts; outcomes align positionally with `items`.
    pub async fn generate_batch(
        &self,
        items: &[GenerationRequest],
    ) -> Result<Vec<Outcome>, RouterError> {
        self.run_batch(items).await
    }

    /// Blocking form of [`Router::generate_batch`].
    pub fn generate_batch_blocking(
        &self,
        items: &[GenerationRequest],
    ) -> Result<Vec<Outcome>, RouterError> {
        self.run_batch_blocking(items)
    }

    /// Flatten a chat transcript into one work item and generate a reply.
    pub async fn chat(&self, messages: &[ChatMessage]) -> Result<String, RouterError> {
        self.run(&GenerationRequest::from_messages(messages)).await
    }
}

// ============================================================================
// Shared parameter lookup
// ============================================================================

/// Per-call parameter first, then the instance config.
fn param<'a>(
    item: &'a GenerationRequest,
    config: &'a AdapterConfig,
    key: &str,
) -> Option<&'a Value> {
    item.params.get(key).or_else(|| config.get(key))
}

/// Model for one call, with the adapter's fallback as the last resort.
fn model_name(item: &GenerationRequest, config: &AdapterConfig, fallback: &str) -> String {
    param(item, config, "model")
        .and_then(Value::as_str)
        .unwrap_or(fallback)
        .to_string()
}
