//! Backend registry
//!
//! One closed name-to-constructor table per operation class. Lookup is
//! case-insensitive; unknown names fail with the full list of valid names
//! before any adapter or gate exists.

use std::sync::Arc;

use crate::backends::Backend;
use crate::config::AdapterConfig;
use crate::error::RouterError;
use crate::routing::descriptor::BackendDescriptor;
use crate::routing::router::Router;
use crate::work::WorkItem;

/// One registered backend: its descriptor plus an adapter constructor.
pub struct RegistryEntry<R: WorkItem> {
    pub descriptor: &'static BackendDescriptor,
    pub build: fn() -> Arc<dyn Backend<R>>,
}

/// Closed table of backends for one operation class.
pub struct Registry<R: WorkItem> {
    entries: &'static [RegistryEntry<R>],
}

impl<R: WorkItem> Registry<R> {
    pub const fn new(entries: &'static [RegistryEntry<R>]) -> Self {
        Self { entries }
    }

    /// Canonical names of every registered backend, in table order.
    pub fn names(&self) -> Vec<&'static str> {
        self.entries
            .iter()
            .map(|entry| entry.descriptor.name)
            .collect()
    }

    /// Descriptor lookup; constructs nothing.
    pub fn descriptor(&self, name: &str) -> Option<&'static BackendDescriptor> {
        let key = canonical(name);
        self.entries
            .iter()
            .map(|entry| entry.descriptor)
            .find(|descriptor| descriptor.name == key)
    }

    /// Construct a router for `name`, merging `overrides` over the adapter's
    /// defaults.
    ///
    /// An unknown name fails here, before any adapter or gate is built. Each
    /// call constructs a fresh adapter: two routers resolved for the same
    /// name do not share a gate or a cached resource.
    pub fn resolve(&self, name: &str, overrides: AdapterConfig) -> Result<Router<R>, RouterError> {
        let key = canonical(name);
        let entry = self
            .entries
            .iter()
            .find(|entry| entry.descriptor.name == key)
            .ok_or_else(|| RouterError::UnknownBackend {
                name: name.trim().to_string(),
                available: self.names().join(", "),
            })?;

        tracing::debug!(backend = entry.descriptor.name, "backend resolved");
        let adapter = (entry.build)();
        Ok(Router::new(entry.descriptor, adapter, overrides))
    }
}

fn canonical(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}
