//! Router error types

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by routers and backend adapters.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RouterError {
    /// The requested backend name is not registered. Raised before any
    /// adapter or gate is constructed.
    #[error("Unknown backend '{name}'. Available backends: {available}")]
    UnknownBackend { name: String, available: String },

    /// A credential was needed at the moment of use and none was configured.
    /// Never raised at construction time.
    #[error("{backend} API key is required. Set {env_key} in the settings file or provide 'api_key' in the adapter config")]
    MissingCredential {
        backend: &'static str,
        env_key: &'static str,
    },

    /// A work item's source does not exist or does not resolve to a file.
    #[error("Input not found: {}", .path.display())]
    InputNotFound { path: PathBuf },

    /// The backend call itself failed: network, quota, malformed input, or
    /// a local-resource fault.
    #[error("{backend} execution failed: {reason}")]
    Execution {
        backend: &'static str,
        reason: String,
    },

    /// The admission gate was torn down underneath a waiter. No code path
    /// in this crate closes a gate, so this is a scaffolding fault.
    #[error("Admission gate unavailable: {0}")]
    Gate(String),

    /// A blocking entry point was misused or its private runtime could not
    /// be built.
    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl RouterError {
    /// Build an `Execution` error from any displayable cause.
    pub fn execution(backend: &'static str, cause: impl fmt::Display) -> Self {
        RouterError::Execution {
            backend,
            reason: cause.to_string(),
        }
    }
}

/// Non-fatal diagnostic produced while validating adapter configuration.
///
/// Warnings never fail construction; they are logged once and carried on
/// the router for introspection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigWarning {
    pub backend: &'static str,
    pub message: String,
}

impl ConfigWarning {
    pub fn new(backend: &'static str, message: impl Into<String>) -> Self {
        Self {
            backend,
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.backend, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_backend_lists_available_names() {
        let err = RouterError::UnknownBackend {
            name: "not-a-backend".to_string(),
            available: "ollama, openai".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("not-a-backend"));
        assert!(message.contains("ollama, openai"));
    }

    #[test]
    fn test_missing_credential_names_env_key() {
        let err = RouterError::MissingCredential {
            backend: "openai",
            env_key: "OPENAI_API_KEY",
        };
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn test_execution_from_displayable_cause() {
        let err = RouterError::execution("deepgram", "connection reset");
        assert_eq!(
            err.to_string(),
            "deepgram execution failed: connection reset"
        );
    }

    #[test]
    fn test_config_warning_display() {
        let warning = ConfigWarning::new("gemini", "API key not found");
        assert_eq!(warning.to_string(), "gemini: API key not found");
    }
}
