//! Routing core
//!
//! The generic dispatch machinery shared by every operation class: backend
//! descriptors, the per-adapter admission gate, the name-to-constructor
//! registry, the router itself, and the batch orchestrator behind it.

mod batch;
mod descriptor;
mod gate;
mod registry;
mod router;

#[cfg(test)]
pub(crate) mod test_support;

pub use descriptor::{BackendDescriptor, Locality, DEFAULT_REMOTE_CEILING};
pub use gate::{AdmissionGate, AdmissionPermit, GateStats};
pub use registry::{Registry, RegistryEntry};
pub use router::{Router, RouterInfo};
