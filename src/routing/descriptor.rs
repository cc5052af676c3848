//! Backend descriptors

use serde::Serialize;
use std::fmt;

/// Default admission ceiling for remote backends. Adapters honor a
/// `max_concurrent` configuration override; local backends are pinned to 1.
pub const DEFAULT_REMOTE_CEILING: usize = 5;

/// Where a backend's work actually runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Locality {
    /// On-host compute owned by this process or machine; one operation at
    /// a time.
    Local,
    /// A network service with its own rate limits.
    Remote,
}

impl Locality {
    pub fn is_local(self) -> bool {
        matches!(self, Locality::Local)
    }
}

impl fmt::Display for Locality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locality::Local => write!(f, "local"),
            Locality::Remote => write!(f, "remote"),
        }
    }
}

/// Static metadata for one backend, defined once per adapter type.
#[derive(Debug, Clone, Serialize)]
pub struct BackendDescriptor {
    /// Unique lowercase canonical name.
    pub name: &'static str,
    pub locality: Locality,
    /// Upper bound on concurrent in-flight operations.
    pub concurrency_ceiling: usize,
    pub supports_streaming: bool,
}

impl BackendDescriptor {
    /// Descriptor for a local backend; the ceiling is pinned to 1.
    pub const fn local(name: &'static str) -> Self {
        Self {
            name,
            locality: Locality::Local,
            concurrency_ceiling: 1,
            supports_streaming: false,
        }
    }

    /// Descriptor for a remote backend with the given default ceiling.
    pub const fn remote(name: &'static str, concurrency_ceiling: usize) -> Self {
        Self {
            name,
            locality: Locality::Remote,
            concurrency_ceiling,
            supports_streaming: false,
        }
    }

    pub const fn streaming(mut self) -> Self {
        self.supports_streaming = true;
        self
    }

    pub fn is_local(&self) -> bool {
        self.locality.is_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_descriptor_pins_ceiling() {
        const D: BackendDescriptor = BackendDescriptor::local("whisper");
        assert_eq!(D.name, "whisper");
        assert_eq!(D.concurrency_ceiling, 1);
        assert!(D.is_local());
        assert!(!D.supports_streaming);
    }

    #[test]
    fn test_remote_descriptor_with_streaming() {
        const D: BackendDescriptor =
            BackendDescriptor::remote("openai", DEFAULT_REMOTE_CEILING).streaming();
        assert_eq!(D.concurrency_ceiling, 5);
        assert!(!D.is_local());
        assert!(D.supports_streaming);
    }

    #[test]
    fn test_locality_display() {
        assert_eq!(Locality::Local.to_string(), "local");
        assert_eq!(Locality::Remote.to_string(), "remote");
    }
}
