//! Whisper adapter
//!
//! Local transcription through a whisper.cpp-style engine binary run as a
//! child process. The heavy resource is the verified model file: checked and
//! cached on first use; `release` drops it and the next call re-creates it.
//! The descriptor pins the ceiling to one.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::process::Command;

use crate::backends::{self, Backend};
use crate::config::AdapterConfig;
use crate::error::{ConfigWarning, RouterError};
use crate::routing::BackendDescriptor;
use crate::work::TranscriptionRequest;

pub(super) static DESCRIPTOR: BackendDescriptor = BackendDescriptor::local("whisper");

const DEFAULT_MODEL_PATH: &str = "models/ggml-base.en.bin";
const DEFAULT_BINARY: &str = "whisper-cli";
const DEFAULT_BEAM_SIZE: u64 = 5;

/// A verified model file. Holding one means the path existed and was a
/// regular file when the handle was created.
#[derive(Debug)]
struct ModelHandle {
    path: PathBuf,
    size_bytes: u64,
}

pub struct WhisperAdapter {
    model: Mutex<Option<Arc<ModelHandle>>>,
}

impl WhisperAdapter {
    pub fn new() -> Self {
        Self {
            model: Mutex::new(None),
        }
    }

    fn cached_model(&self) -> Option<Arc<ModelHandle>> {
        self.model.lock().unwrap().clone()
    }

    /// Verify the model file and cache the handle. Subsequent calls reuse
    /// the cached handle until `release` drops it.
    async fn ensure_model(
        &self,
        config: &AdapterConfig,
    ) -> Result<Arc<ModelHandle>, RouterError> {
        if let Some(handle) = self.cached_model() {
            return Ok(handle);
        }

        let path = PathBuf::from(config.get_str("model_path").unwrap_or(DEFAULT_MODEL_PATH));
        let metadata = tokio::fs::metadata(&path).await.map_err(|_| {
            RouterError::execution(
                "whisper",
                format!(
                    "model file {} not found. Set 'model_path' in the adapter config",
                    path.display()
                ),
            )
        })?;
        if !metadata.is_file() {
            return Err(RouterError::execution(
                "whisper",
                format!("model path {} is not a file", path.display()),
            ));
        }

        let handle = Arc::new(ModelHandle {
            path,
            size_bytes: metadata.len(),
        });
        tracing::info!(
            model = %handle.path.display(),
            size_bytes = handle.size_bytes,
            "transcription model loaded"
        );

        let mut slot = self.model.lock().unwrap();
        Ok(Arc::clone(slot.get_or_insert(handle)))
    }

    #[cfg(test)]
    fn model_loaded(&self) -> bool {
        self.model.lock().unwrap().is_some()
    }
}

impl Default for WhisperAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend<TranscriptionRequest> for WhisperAdapter {
    fn descriptor(&self) -> &'static BackendDescriptor {
        &DESCRIPTOR
    }

    fn defaults(&self) -> AdapterConfig {
        AdapterConfig::new()
            .with("model_path", DEFAULT_MODEL_PATH)
            .with("binary", DEFAULT_BINARY)
            .with("beam_size", DEFAULT_BEAM_SIZE)
    }

    fn validate(&self, config: &mut AdapterConfig) -> Vec<ConfigWarning> {
        let path = Path::new(config.get_str("model_path").unwrap_or(DEFAULT_MODEL_PATH));
        if path.is_file() {
            return Vec::new();
        }
        vec![ConfigWarning::new(
            "whisper",
            format!(
                "model file {} not found; transcription will fail until it exists",
                path.display()
            ),
        )]
    }

    async fn execute(
        &self,
        item: &TranscriptionRequest,
        config: &AdapterConfig,
    ) -> Result<String, RouterError> {
        backends::ensure_source(&item.source).await?;
        let model = self.ensure_model(config).await?;
        let binary = config.get_str("binary").unwrap_or(DEFAULT_BINARY).to_string();
        let args = engine_args(&model.path, &item.source, config);

        tracing::debug!(
            binary = %binary,
            source = %item.source.display(),
            "running transcription engine"
        );

        let output = Command::new(&binary)
            .args(&args)
            .output()
            .await
            .map_err(|err| engine_error(&binary, err))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RouterError::execution(
                "whisper",
                format!(
                    "engine exited with {}: {}",
                    output.status,
                    backends::snippet(&stderr)
                ),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn release(&self) {
        let released = self.model.lock().unwrap().take();
        if let Some(handle) = released {
            tracing::info!(model = %handle.path.display(), "transcription model released");
        }
    }
}

/// Engine invocation: plain text to stdout, no progress, no timestamps.
fn engine_args(model: &Path, source: &Path, config: &AdapterConfig) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "-m".into(),
        model.as_os_str().to_os_string(),
        "-f".into(),
        source.as_os_str().to_os_string(),
        "-np".into(),
        "-nt".into(),
    ];
    if let Some(language) = config.get_str("language") {
        args.push("-l".into());
        args.push(language.into());
    }
    if let Some(beam_size) = config.get_u64("beam_size") {
        args.push("-bs".into());
        args.push(beam_size.to_string().into());
    }
    args
}

fn engine_error(binary: &str, err: std::io::Error) -> RouterError {
    if err.kind() == std::io::ErrorKind::NotFound {
        return RouterError::execution(
            "whisper",
            format!(
                "engine binary '{}' not found; set 'binary' in the adapter config",
                binary
            ),
        );
    }
    RouterError::execution("whisper", format!("failed to run engine: {}", err))
}
