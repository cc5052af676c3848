//! Uniform dispatch over interchangeable inference backends
//!
//! Two operation classes share one admission-controlled core: text
//! generation and audio transcription. Resolving a backend by name yields a
//! [`Router`] whose gate keeps concurrent work inside that backend's
//! ceiling, for single items or positionally-ordered batches.

// Public modules
pub mod backends;
pub mod config;
pub mod error;
pub mod logging;
pub mod routing;
pub mod work;

// Re-export commonly used types
pub use backends::generation::GenerationRouter;
pub use backends::transcription::TranscriptionRouter;
pub use backends::Backend;
pub use config::{AdapterConfig, ConfigResolver};
pub use error::{ConfigWarning, RouterError};
pub use routing::{
    AdmissionGate, BackendDescriptor, GateStats, Locality, Registry, RegistryEntry, Router,
    RouterInfo,
};
pub use work::{
    ChatMessage, ChatRole, GenerationRequest, Outcome, TranscriptionRequest, WorkItem,
};
