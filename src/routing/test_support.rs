//! Shared fixtures for routing tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::backends::Backend;
use crate::config::AdapterConfig;
use crate::error::{ConfigWarning, RouterError};
use crate::routing::{BackendDescriptor, RegistryEntry, Router};
use crate::work::GenerationRequest;

pub(crate) static MOCK_LOCAL: BackendDescriptor = BackendDescriptor::local("mock-local");
pub(crate) static MOCK_REMOTE: BackendDescriptor = BackendDescriptor::remote("mock-remote", 3);

pub(crate) fn item(prompt: &str) -> GenerationRequest {
    GenerationRequest::new(prompt)
}

/// The mock adapter fails any prompt containing "boom".
pub(crate) fn failing_item() -> GenerationRequest {
    GenerationRequest::new("boom")
}

/// Tracks how many mock executions overlap.
#[derive(Debug, Default)]
pub(crate) struct Concurrency {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl Concurrency {
    pub(crate) fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Scripted adapter: sleeps for a fixed delay, then echoes the prompt with
/// the temperature it captured, or fails when the prompt says so.
pub(crate) struct MockAdapter {
    descriptor: &'static BackendDescriptor,
    delay: Duration,
    concurrency: Arc<Concurrency>,
}

impl MockAdapter {
    pub(crate) fn new(descriptor: &'static BackendDescriptor, delay: Duration) -> Self {
        Self {
            descriptor,
            delay,
            concurrency: Arc::new(Concurrency::default()),
        }
    }

    pub(crate) fn concurrency(&self) -> Arc<Concurrency> {
        Arc::clone(&self.concurrency)
    }
}

#[async_trait]
impl Backend<GenerationRequest> for MockAdapter {
    fn descriptor(&self) -> &'static BackendDescriptor {
        self.descriptor
    }

    fn defaults(&self) -> AdapterConfig {
        AdapterConfig::new().with("temperature", 0.7)
    }

    fn validate(&self, _config: &mut AdapterConfig) -> Vec<ConfigWarning> {
        Vec::new()
    }

    async fn execute(
        &self,
        item: &GenerationRequest,
        config: &AdapterConfig,
    ) -> Result<String, RouterError> {
        self.concurrency.enter();
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.concurrency.exit();

        if item.prompt.contains("boom") {
            return Err(RouterError::execution(
                self.descriptor.name,
                "scripted failure",
            ));
        }
        let temperature = config.get_f64("temperature").unwrap_or_default();
        Ok(format!("echo[t={}]: {}", temperature, item.prompt))
    }
}

pub(crate) fn mock_router(
    descriptor: &'static BackendDescriptor,
    delay: Duration,
) -> (Router<GenerationRequest>, Arc<Concurrency>) {
    mock_router_configured(descriptor, delay, AdapterConfig::new())
}

pub(crate) fn mock_router_configured(
    descriptor: &'static BackendDescriptor,
    delay: Duration,
    overrides: AdapterConfig,
) -> (Router<GenerationRequest>, Arc<Concurrency>) {
    let adapter = MockAdapter::new(descriptor, delay);
    let concurrency = adapter.concurrency();
    (
        Router::new(descriptor, Arc::new(adapter), overrides),
        concurrency,
    )
}

fn build_mock_local() -> Arc<dyn Backend<GenerationRequest>> {
    Arc::new(MockAdapter::new(&MOCK_LOCAL, Duration::ZERO))
}

fn build_mock_remote() -> Arc<dyn Backend<GenerationRequest>> {
    Arc::new(MockAdapter::new(&MOCK_REMOTE, Duration::ZERO))
}

static MOCK_ENTRIES: [RegistryEntry<GenerationRequest>; 2] = [
    RegistryEntry {
        descriptor: &MOCK_LOCAL,
        build: build_mock_local,
    },
    RegistryEntry {
        descriptor: &MOCK_REMOTE,
        build: build_mock_remote,
    },
];

/// Entries for a two-backend mock registry.
pub(crate) fn mock_entries() -> &'static [RegistryEntry<GenerationRequest>] {
    &MOCK_ENTRIES
}
