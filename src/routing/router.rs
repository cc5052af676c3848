//! Router
//!
//! One router per resolved backend: exactly one adapter instance, one
//! admission gate, and the live configuration map. The batch fan-out lives
//! in `batch`; this module owns the single-item path and the blocking shims.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, RwLock};
use std::time::Instant;

use crate::backends::Backend;
use crate::config::AdapterConfig;
use crate::error::{ConfigWarning, RouterError};
use crate::routing::batch;
use crate::routing::descriptor::{BackendDescriptor, Locality};
use crate::routing::gate::{AdmissionGate, GateStats};
use crate::work::{Outcome, WorkItem};

// ============================================================================
// Introspection payload
// ============================================================================

/// Snapshot of a live router; secret config values arrive masked.
#[derive(Debug, Clone, Serialize)]
pub struct RouterInfo {
    pub backend: &'static str,
    pub locality: Locality,
    pub concurrency_ceiling: usize,
    pub supports_streaming: bool,
    pub config: BTreeMap<String, Value>,
    pub warnings: Vec<String>,
}

// ============================================================================
// Router
// ============================================================================

/// Dispatches work items to one backend under its admission gate.
pub struct Router<R: WorkItem> {
    descriptor: &'static BackendDescriptor,
    adapter: Arc<dyn Backend<R>>,
    gate: Arc<AdmissionGate>,
    config: RwLock<AdapterConfig>,
    warnings: Vec<ConfigWarning>,
}

impl<R: WorkItem> std::fmt::Debug for Router<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // `adapter` is a trait object and `config` holds unmasked secrets;
        // neither belongs in Debug output.
        f.debug_struct("Router")
            .field("descriptor", &self.descriptor)
            .field("gate", &self.gate)
            .field("warnings", &self.warnings)
            .finish_non_exhaustive()
    }
}

impl<R: WorkItem> Router<R> {
    /// Build a router around a freshly constructed adapter.
    ///
    /// Merges call-site overrides over the adapter's defaults, runs the
    /// non-fatal validation pass, and sizes the gate from the effective
    /// ceiling: `max_concurrent` override for remote backends, pinned to 1
    /// for local ones.
    pub(crate) fn new(
        descriptor: &'static BackendDescriptor,
        adapter: Arc<dyn Backend<R>>,
        overrides: AdapterConfig,
    ) -> Self {
        let mut config = adapter.defaults();
        config.merge(overrides);

        let warnings = adapter.validate(&mut config);
        for warning in &warnings {
            tracing::warn!(backend = descriptor.name, "{}", warning.message);
        }

        let ceiling = effective_ceiling(descriptor, &config);
        tracing::debug!(
            backend = descriptor.name,
            locality = %descriptor.locality,
            ceiling,
            "router constructed"
        );

        Self {
            descriptor,
            adapter,
            gate: Arc::new(AdmissionGate::new(ceiling)),
            config: RwLock::new(config),
            warnings,
        }
    }

    pub fn descriptor(&self) -> &'static BackendDescriptor {
        self.descriptor
    }

    /// Canonical name of the routed backend.
    pub fn backend(&self) -> &'static str {
        self.descriptor.name
    }

    /// Construction diagnostics (missing credentials and similar).
    pub fn warnings(&self) -> &[ConfigWarning] {
        &self.warnings
    }

    pub fn gate_stats(&self) -> GateStats {
        self.gate.stats()
    }

    /// Current configuration, unmasked. Each call captures its own copy of
    /// this at entry, so later updates never affect work already admitted.
    pub fn config_snapshot(&self) -> AdapterConfig {
        self.config.read().unwrap().clone()
    }

    /// Merge a partial configuration into the live instance without
    /// reconstruction. In-flight calls keep the snapshot they captured; the
    /// admission ceiling is fixed at construction.
    pub fn update_config(&self, partial: AdapterConfig) {
        self.config.write().unwrap().merge(partial);
        tracing::debug!(backend = self.descriptor.name, "adapter configuration updated");
    }

    /// Run one work item through the admission gate.
    pub async fn run(&self, item: &R) -> Result<String, RouterError> {
        let config = self.config_snapshot();
        let request_id = uuid::Uuid::new_v4();
        tracing::debug!(
            backend = self.descriptor.name,
            request_id = %request_id,
            item = %item.label(),
            "waiting for admission"
        );

        let _permit = self.gate.admit().await?;
        let started = Instant::now();
        let result = self.adapter.execute(item, &config).await;

        match &result {
            Ok(text) => tracing::info!(
                backend = self.descriptor.name,
                request_id = %request_id,
                elapsed_ms = started.elapsed().as_millis() as u64,
                chars = text.len(),
                "work item completed"
            ),
            Err(err) => tracing::warn!(
                backend = self.descriptor.name,
                request_id = %request_id,
                elapsed_ms = started.elapsed().as_millis() as u64,
                error = %err,
                "work item failed"
            ),
        }
        result
    }

    /// Run a batch. Slots come back in input order with per-item failures
    /// isolated as `Failure` outcomes; see [`Outcome`].
    pub async fn run_batch(&self, items: &[R]) -> Result<Vec<Outcome>, RouterError> {
        batch::run(self, items).await
    }

    /// Blocking wrapper around [`Router::run`].
    ///
    /// Drives a private current-thread runtime to completion; refuses to run
    /// inside an existing async runtime instead of deadlocking it.
    pub fn run_blocking(&self, item: &R) -> Result<String, RouterError> {
        block_on(self.run(item))?
    }

    /// Blocking wrapper around [`Router::run_batch`].
    pub fn run_batch_blocking(&self, items: &[R]) -> Result<Vec<Outcome>, RouterError> {
        block_on(self.run_batch(items))?
    }

    /// Release the adapter's cached heavy resource, if any. Idempotent; the
    /// next call re-creates the resource.
    pub async fn release(&self) {
        self.adapter.release().await;
    }

    /// Masked snapshot of this instance for introspection.
    pub fn describe(&self) -> RouterInfo {
        RouterInfo {
            backend: self.descriptor.name,
            locality: self.descriptor.locality,
            concurrency_ceiling: self.gate.ceiling(),
            supports_streaming: self.descriptor.supports_streaming,
            config: self.config.read().unwrap().masked(),
            warnings: self
                .warnings
                .iter()
                .map(|warning| warning.message.clone())
                .collect(),
        }
    }
}

fn effective_ceiling(descriptor: &BackendDescriptor, config: &AdapterConfig) -> usize {
    if descriptor.locality.is_local() {
        1
    } else {
        config
            .get_u64("max_concurrent")
            .map(|n| n as usize)
            .filter(|n| *n > 0)
            .unwrap_or(descriptor.concurrency_ceiling)
    }
}

/// Drive a future to completion from synchronous code.
fn block_on<F: Future>(future: F) -> Result<F::Output, RouterError> {
    if tokio::runtime::Handle::try_current().is_ok() {
        return Err(RouterError::Runtime(
            "blocking entry point called inside an async runtime; use the async variant".to_string(),
        ));
    }
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| RouterError::Runtime(err.to_string()))?;
    Ok(runtime.block_on(future))
}
