//! Audio transcription backends
//!
//! One registry over the five transcription adapters plus the class-specific
//! surface: `transcribe` aliases on the router and one-shot module functions.

mod assemblyai;
mod deepgram;
mod elevenlabs;
mod togetherai;
mod whisper;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::AdapterConfig;
use crate::error::RouterError;
use crate::routing::{BackendDescriptor, Registry, RegistryEntry, Router};
use crate::work::{Outcome, TranscriptionRequest};

use super::Backend;

/// Backend used when the caller does not name one. Local, so a fresh
/// checkout works without any credential.
pub const DEFAULT_BACKEND: &str = "whisper";

/// Router specialized to transcription work items.
pub type TranscriptionRouter = Router<TranscriptionRequest>;

static ENTRIES: [RegistryEntry<TranscriptionRequest>; 5] = [
    RegistryEntry {
        descriptor: &whisper::DESCRIPTOR,
        build: build_whisper,
    },
    RegistryEntry {
        descriptor: &deepgram::DESCRIPTOR,
        build: build_deepgram,
    },
    RegistryEntry {
        descriptor: &assemblyai::DESCRIPTOR,
        build: build_assemblyai,
    },
    RegistryEntry {
        descriptor: &togetherai::DESCRIPTOR,
        build: build_togetherai,
    },
    RegistryEntry {
        descriptor: &elevenlabs::DESCRIPTOR,
        build: build_elevenlabs,
    },
];

/// The transcription backend registry.
pub static REGISTRY: Registry<TranscriptionRequest> = Registry::new(&ENTRIES);

fn build_whisper() -> Arc<dyn Backend<TranscriptionRequest>> {
    Arc::new(whisper::WhisperAdapter::new())
}

fn build_deepgram() -> Arc<dyn Backend<TranscriptionRequest>> {
    Arc::new(deepgram::DeepgramAdapter::new())
}

fn build_assemblyai() -> Arc<dyn Backend<TranscriptionRequest>> {
    Arc::new(assemblyai::AssemblyAiAdapter::new())
}

fn build_togetherai() -> Arc<dyn Backend<TranscriptionRequest>> {
    Arc::new(togetherai::TogetherAiAdapter::new())
}

fn build_elevenlabs() -> Arc<dyn Backend<TranscriptionRequest>> {
    Arc::new(elevenlabs::ElevenLabsAdapter::new())
}

// ============================================================================
// Module surface
// ============================================================================

/// Resolve a transcription backend by name (case-insensitive).
pub fn resolve(name: &str, overrides: AdapterConfig) -> Result<TranscriptionRouter, RouterError> {
    REGISTRY.resolve(name, overrides)
}

/// Canonical names of the registered transcription backends.
pub fn list_backends() -> Vec<&'static str> {
    REGISTRY.names()
}

/// Descriptor for `name`, constructing nothing.
pub fn describe(name: &str) -> Option<&'static BackendDescriptor> {
    REGISTRY.descriptor(name)
}

/// One-shot transcription through a freshly resolved router.
pub async fn transcribe(
    source: impl Into<PathBuf>,
    backend: &str,
    overrides: AdapterConfig,
) -> Result<String, RouterError> {
    resolve(backend, overrides)?
        .transcribe(&TranscriptionRequest::new(source))
        .await
}

/// One-shot batch transcription; the returned outcomes align with `sources`.
pub async fn transcribe_batch(
    sources: &[PathBuf],
    backend: &str,
    overrides: AdapterConfig,
) -> Result<Vec<Outcome>, RouterError> {
    let items: Vec<TranscriptionRequest> = sources
        .iter()
        .map(TranscriptionRequest::new)
        .collect();
    resolve(backend, overrides)?.transcribe_batch(&items).await
}

// ============================================================================
// Class aliases on the router
// ============================================================================

impl Router<TranscriptionRequest> {
    /// Transcribe one audio source.
    pub async fn transcribe(&self, item: &TranscriptionRequest) -> Result<String, RouterError> {
        self.run(item).await
    }

    /// Blocking form of [`Router::transcribe`]; refuses to run inside an
    /// async runtime.
    pub fn transcribe_blocking(&self, item: &TranscriptionRequest) -> Result<String, RouterError> {
        self.run_blocking(item)
    }

    /// Run a batch of sources; outcomes align positionally with `items`.
    pub async fn transcribe_batch(
        &self,
        items: &[TranscriptionRequest],
    ) -> Result<Vec<Outcome>, RouterError> {
        self.run_batch(items).await
    }

    /// Blocking form of [`Router::transcribe_batch`].
    pub fn transcribe_batch_blocking(
        &self,
        items: &[TranscriptionRequest],
    ) -> Result<Vec<Outcome>, RouterError> {
        self.run_batch_blocking(items)
    }
}

/// File name to label an uploaded audio part with.
fn audio_part_name(source: &Path) -> String {
    source
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "audio".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::Locality;

    #[test]
    fn test_registry_lists_backends_in_table_order() {
        assert_eq!(
            list_backends(),
            vec!["whisper", "deepgram", "assemblyai", "togetherai", "elevenlabs"]
        );
    }

    #[test]
    fn test_descriptors_match_the_locality_table() {
        let whisper = describe("whisper").unwrap();
        assert_eq!(whisper.locality, Locality::Local);
        assert_eq!(whisper.concurrency_ceiling, 1);

        for name in ["deepgram", "assemblyai", "togetherai", "elevenlabs"] {
            let descriptor = describe(name).unwrap();
            assert_eq!(descriptor.locality, Locality::Remote);
            assert_eq!(descriptor.concurrency_ceiling, 5);
        }
        assert!(list_backends()
            .iter()
            .all(|name| !describe(name).unwrap().supports_streaming));
    }

    #[test]
    fn test_unknown_backend_enumerates_valid_names() {
        let err = resolve("parakeet", AdapterConfig::new()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unknown backend 'parakeet'. Available backends: whisper, deepgram, assemblyai, togetherai, elevenlabs"
        );
    }

    #[tokio::test]
    async fn test_missing_source_surfaces_through_the_router() {
        let router = resolve("whisper", AdapterConfig::new()).unwrap();
        let err = router
            .transcribe(&TranscriptionRequest::new("/nonexistent/audio.wav"))
            .await
            .unwrap_err();
        assert!(matches!(err, RouterError::InputNotFound { .. }));
    }

    #[test]
    fn test_audio_part_name_falls_back_when_nameless() {
        assert_eq!(audio_part_name(Path::new("/tmp/take-1.wav")), "take-1.wav");
        assert_eq!(audio_part_name(Path::new("/")), "audio");
    }
}
