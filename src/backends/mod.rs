//! Backend adapters
//!
//! One adapter per backend behind the [`Backend`] trait. The `generation`
//! and `transcription` modules each carry the registry of constructors for
//! their operation class; this module holds the trait and the helpers the
//! adapters share.

pub mod generation;
pub mod transcription;

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::config::{self, AdapterConfig};
use crate::error::{ConfigWarning, RouterError};
use crate::routing::BackendDescriptor;
use crate::work::WorkItem;

/// Default per-request timeout for remote calls, seconds. Overridable per
/// adapter via the `timeout_secs` configuration key.
pub(crate) const DEFAULT_TIMEOUT_SECS: u64 = 120;

// ============================================================================
// Adapter contract
// ============================================================================

/// One interchangeable backend for a single operation class.
///
/// Adapters are cheap to construct and construction never fails: a missing
/// credential is a validation warning that only becomes an error when
/// `execute` actually needs it, so backends can be listed and inspected
/// without credentials present.
#[async_trait]
pub trait Backend<R: WorkItem>: Send + Sync {
    /// Static metadata for this backend.
    fn descriptor(&self) -> &'static BackendDescriptor;

    /// Default configuration, merged beneath call-site overrides.
    fn defaults(&self) -> AdapterConfig {
        AdapterConfig::new()
    }

    /// Non-fatal configuration check at construction time.
    ///
    /// May complete the config (e.g. pull the backend's secret out of the
    /// process-wide resolver); anything missing surfaces as warnings, never
    /// as an error.
    fn validate(&self, config: &mut AdapterConfig) -> Vec<ConfigWarning>;

    /// Perform one unit of work.
    ///
    /// Safe to call repeatedly and concurrently up to the descriptor's
    /// ceiling. `config` is the snapshot captured when the call entered the
    /// router, so live updates cannot shear an in-flight operation.
    async fn execute(&self, item: &R, config: &AdapterConfig) -> Result<String, RouterError>;

    /// Drop any cached heavy resource. Idempotent; the next `execute`
    /// re-creates it. The default is a no-op for adapters without one.
    async fn release(&self) {}
}

// ============================================================================
// Shared adapter helpers
// ============================================================================

/// Pull `backend`'s secret from the process-wide resolver into `config` when
/// the call site did not supply one. Returns the warning to surface when
/// neither is present; never fails.
pub(crate) fn resolve_api_key(
    backend: &'static str,
    config: &mut AdapterConfig,
) -> Option<ConfigWarning> {
    if config.get_str("api_key").map_or(false, |key| !key.is_empty()) {
        return None;
    }
    let env_key = config::secret_key_for(backend)?;
    match config::global().secret_for(backend) {
        Some(secret) => {
            config.set("api_key", secret);
            None
        }
        None => Some(ConfigWarning::new(
            backend,
            format!(
                "{} API key not found. Set {} in {} or provide 'api_key' in the adapter config",
                backend,
                env_key,
                config::SETTINGS_FILE
            ),
        )),
    }
}

/// The configured API key, or the use-time credential error.
pub(crate) fn require_api_key<'a>(
    backend: &'static str,
    config: &'a AdapterConfig,
) -> Result<&'a str, RouterError> {
    config
        .get_str("api_key")
        .filter(|key| !key.is_empty())
        .ok_or(RouterError::MissingCredential {
            backend,
            env_key: config::secret_key_for(backend).unwrap_or("API_KEY"),
        })
}

/// Per-request timeout from the adapter configuration.
pub(crate) fn request_timeout(config: &AdapterConfig) -> Duration {
    Duration::from_secs(
        config
            .get_u64("timeout_secs")
            .unwrap_or(DEFAULT_TIMEOUT_SECS),
    )
}

/// Read an audio source fully, distinguishing a missing file from other
/// I/O faults.
pub(crate) async fn read_source(
    backend: &'static str,
    path: &Path,
) -> Result<Vec<u8>, RouterError> {
    ensure_source(path).await?;
    tokio::fs::read(path).await.map_err(|err| {
        RouterError::execution(
            backend,
            format!("failed to read {}: {}", path.display(), err),
        )
    })
}

/// Check that a work item's source resolves to a regular file.
pub(crate) async fn ensure_source(path: &Path) -> Result<(), RouterError> {
    match tokio::fs::metadata(path).await {
        Ok(metadata) if metadata.is_file() => Ok(()),
        Ok(_) => Err(RouterError::InputNotFound {
            path: path.to_path_buf(),
        }),
        Err(_) => Err(RouterError::InputNotFound {
            path: path.to_path_buf(),
        }),
    }
}

/// Render a non-success HTTP response into an execution error.
pub(crate) async fn status_error(
    backend: &'static str,
    response: reqwest::Response,
) -> RouterError {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<no body>".to_string());
    RouterError::Execution {
        backend,
        reason: format!("HTTP {}: {}", status, snippet(&body)),
    }
}

/// Check the status and decode a JSON body.
pub(crate) async fn expect_json<T: DeserializeOwned>(
    backend: &'static str,
    response: reqwest::Response,
) -> Result<T, RouterError> {
    if !response.status().is_success() {
        return Err(status_error(backend, response).await);
    }
    response.json::<T>().await.map_err(|err| {
        tracing::error!(backend, error = %err, "failed to decode backend response");
        RouterError::execution(backend, format!("invalid response: {}", err))
    })
}

/// First few hundred characters of an error body, trimmed for log hygiene.
pub(crate) fn snippet(body: &str) -> String {
    const MAX_CHARS: usize = 240;
    let trimmed = body.trim();
    match trimmed.char_indices().nth(MAX_CHARS) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}
