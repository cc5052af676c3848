//! Process-wide settings resolver
//!
//! Loads known secret environment variables first, then the settings file;
//! file values override the environment. One resolver is shared process-wide
//! behind an explicit install/reset contract so tests can isolate themselves.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use super::{is_secret_key, mask_secret};

/// Default settings file, resolved against the working directory.
pub const SETTINGS_FILE: &str = "env.config";

/// Fixed backend name to environment key mapping for secrets.
const SECRET_KEYS: [(&str, &str); 7] = [
    ("openai", "OPENAI_API_KEY"),
    ("gemini", "GEMINI_API_KEY"),
    ("grok", "GROK_API_KEY"),
    ("deepgram", "DEEPGRAM_API_KEY"),
    ("assemblyai", "ASSEMBLYAI_API_KEY"),
    ("togetherai", "TOGETHER_API_KEY"),
    ("elevenlabs", "ELEVENLABS_API_KEY"),
];

/// Environment key holding the secret for `backend`, if it has one.
pub fn secret_key_for(backend: &str) -> Option<&'static str> {
    let needle = backend.to_ascii_lowercase();
    SECRET_KEYS
        .iter()
        .find(|(name, _)| *name == needle)
        .map(|(_, key)| *key)
}

// ============================================================================
// Resolver
// ============================================================================

/// Layered settings cache: known environment secrets first, settings file on
/// top. Reads are cheap; `reload` repeats both passes.
#[derive(Debug)]
pub struct ConfigResolver {
    path: PathBuf,
    values: RwLock<HashMap<String, String>>,
}

impl ConfigResolver {
    /// Load from the default settings file location.
    pub fn load() -> Self {
        Self::with_path(SETTINGS_FILE)
    }

    /// Load from a specific settings file path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = load_layers(&path, |key| std::env::var(key).ok());
        Self {
            path,
            values: RwLock::new(values),
        }
    }

    #[cfg(test)]
    fn with_env(path: impl Into<PathBuf>, env: &HashMap<String, String>) -> Self {
        let path = path.into();
        let values = load_layers(&path, |key| env.get(key).cloned());
        Self {
            path,
            values: RwLock::new(values),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Cached value for `key`, if any.
    pub fn get(&self, key: &str) -> Option<String> {
        self.values.read().unwrap().get(key).cloned()
    }

    /// Set one cached value at runtime; not persisted, lost on `reload`.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.values.write().unwrap().insert(key.into(), value.into());
    }

    /// Secret for `backend` via the fixed table: cached value first, then a
    /// live environment fallback. Empty values count as absent.
    pub fn secret_for(&self, backend: &str) -> Option<String> {
        let env_key = secret_key_for(backend)?;
        self.get(env_key)
            .or_else(|| std::env::var(env_key).ok())
            .filter(|value| !value.is_empty())
    }

    /// Drop the cache and repeat both load passes.
    pub fn reload(&self) {
        let fresh = load_layers(&self.path, |key| std::env::var(key).ok());
        *self.values.write().unwrap() = fresh;
        tracing::debug!(path = %self.path.display(), "settings reloaded");
    }

    /// All cached settings with secret-like values masked.
    pub fn snapshot_masked(&self) -> BTreeMap<String, String> {
        self.values
            .read()
            .unwrap()
            .iter()
            .map(|(key, value)| {
                let rendered = if is_secret_key(key) {
                    mask_secret(value)
                } else {
                    value.clone()
                };
                (key.clone(), rendered)
            })
            .collect()
    }
}

/// Run both load passes: the known secret environment variables, then the
/// settings file whose entries override them.
fn load_layers(
    path: &Path,
    env_lookup: impl Fn(&str) -> Option<String>,
) -> HashMap<String, String> {
    let mut values = HashMap::new();

    for (_, env_key) in SECRET_KEYS {
        if let Some(value) = env_lookup(env_key) {
            if !value.is_empty() {
                values.insert(env_key.to_string(), value);
            }
        }
    }

    match std::fs::read_to_string(path) {
        Ok(contents) => {
            let parsed = parse_settings(&contents);
            let entries = parsed.len();
            values.extend(parsed);
            tracing::debug!(path = %path.display(), entries, "settings file loaded");
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "settings file unreadable");
        }
    }

    values
}

/// Parse `KEY=value` lines. Comments and lines without `=` are skipped,
/// surrounding quotes on values are stripped, and blank values are not
/// stored so an environment value stays authoritative.
fn parse_settings(contents: &str) -> HashMap<String, String> {
    let mut values = HashMap::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
        if !key.is_empty() && !value.is_empty() {
            values.insert(key.to_string(), value.to_string());
        }
    }
    values
}

// ============================================================================
// Process-wide instance
// ============================================================================

static GLOBAL: Mutex<Option<Arc<ConfigResolver>>> = Mutex::new(None);

/// The process-wide resolver, lazily loaded from the default settings file
/// on first access.
pub fn global() -> Arc<ConfigResolver> {
    let mut slot = GLOBAL.lock().unwrap();
    match slot.as_ref() {
        Some(resolver) => Arc::clone(resolver),
        None => {
            let resolver = Arc::new(ConfigResolver::load());
            *slot = Some(Arc::clone(&resolver));
            resolver
        }
    }
}

/// Replace the process-wide resolver (e.g. to honor a `--config` flag).
pub fn install(resolver: ConfigResolver) -> Arc<ConfigResolver> {
    let resolver = Arc::new(resolver);
    *GLOBAL.lock().unwrap() = Some(Arc::clone(&resolver));
    resolver
}

/// Drop the process-wide resolver; the next access reloads it. Routers keep
/// whatever they already resolved, so this is only for test isolation and
/// explicit reconfiguration.
pub fn reset() {
    *GLOBAL.lock().unwrap() = None;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Seek, Write};

    fn env_of(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn settings_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_parse_settings_skips_comments_and_junk() {
        let parsed = parse_settings(
            "# comment line\n\
             DEEPGRAM_API_KEY=abc123def456\n\
             \n\
             no equals sign here\n\
             QUOTED=\"quoted value\"\n\
             SINGLE='single quoted'\n\
             BLANK=\n\
             SPACED =  padded \n",
        );

        assert_eq!(parsed.get("DEEPGRAM_API_KEY").unwrap(), "abc123def456");
        assert_eq!(parsed.get("QUOTED").unwrap(), "quoted value");
        assert_eq!(parsed.get("SINGLE").unwrap(), "single quoted");
        assert_eq!(parsed.get("SPACED").unwrap(), "padded");
        assert!(!parsed.contains_key("BLANK"));
        assert_eq!(parsed.len(), 4);
    }

    #[test]
    fn test_parse_settings_splits_on_first_equals() {
        let parsed = parse_settings("KEY=a=b=c\n");
        assert_eq!(parsed.get("KEY").unwrap(), "a=b=c");
    }

    #[test]
    fn test_file_overrides_environment() {
        let file = settings_file("OPENAI_API_KEY=from-file-1234\n");
        let env = env_of(&[("OPENAI_API_KEY", "from-env-5678")]);

        let resolver = ConfigResolver::with_env(file.path(), &env);
        assert_eq!(
            resolver.get("OPENAI_API_KEY").as_deref(),
            Some("from-file-1234")
        );
    }

    #[test]
    fn test_environment_used_when_file_omits_key() {
        let file = settings_file("DEEPGRAM_API_KEY=dgfile12345\n");
        let env = env_of(&[("GEMINI_API_KEY", "gmenv1234567")]);

        let resolver = ConfigResolver::with_env(file.path(), &env);
        assert_eq!(resolver.get("GEMINI_API_KEY").as_deref(), Some("gmenv1234567"));
        assert_eq!(resolver.get("DEEPGRAM_API_KEY").as_deref(), Some("dgfile12345"));
        assert_eq!(resolver.get("TOGETHER_API_KEY"), None);
    }

    #[test]
    fn test_blank_file_value_leaves_environment_authoritative() {
        let file = settings_file("OPENAI_API_KEY=\n");
        let env = env_of(&[("OPENAI_API_KEY", "from-env-5678")]);

        let resolver = ConfigResolver::with_env(file.path(), &env);
        assert_eq!(
            resolver.get("OPENAI_API_KEY").as_deref(),
            Some("from-env-5678")
        );
    }

    #[test]
    fn test_secret_for_uses_fixed_table() {
        let file = settings_file("DEEPGRAM_API_KEY=dg-secret-123\nUNRELATED=x\n");
        let resolver = ConfigResolver::with_env(file.path(), &HashMap::new());

        assert_eq!(
            resolver.secret_for("deepgram").as_deref(),
            Some("dg-secret-123")
        );
        // lookup is case-insensitive on the backend name
        assert_eq!(
            resolver.secret_for("DeepGram").as_deref(),
            Some("dg-secret-123")
        );
        assert_eq!(resolver.secret_for("not-a-backend"), None);
    }

    #[test]
    fn test_set_is_runtime_only_and_reload_restores_file() {
        let file = settings_file("ASSEMBLYAI_API_KEY=original-1234\n");
        let resolver = ConfigResolver::with_env(file.path(), &HashMap::new());

        resolver.set("ASSEMBLYAI_API_KEY", "patched-5678");
        assert_eq!(
            resolver.get("ASSEMBLYAI_API_KEY").as_deref(),
            Some("patched-5678")
        );

        resolver.reload();
        assert_eq!(
            resolver.get("ASSEMBLYAI_API_KEY").as_deref(),
            Some("original-1234")
        );
    }

    #[test]
    fn test_reload_picks_up_file_changes() {
        let mut file = settings_file("TOGETHER_API_KEY=first-value-1\n");
        let resolver = ConfigResolver::with_env(file.path(), &HashMap::new());
        assert_eq!(
            resolver.get("TOGETHER_API_KEY").as_deref(),
            Some("first-value-1")
        );

        file.as_file_mut().set_len(0).unwrap();
        file.as_file_mut().rewind().unwrap();
        file.write_all(b"TOGETHER_API_KEY=second-value-2\n").unwrap();
        file.flush().unwrap();

        resolver.reload();
        assert_eq!(
            resolver.get("TOGETHER_API_KEY").as_deref(),
            Some("second-value-2")
        );
    }

    #[test]
    fn test_snapshot_masks_secret_keys() {
        let file = settings_file(
            "ELEVENLABS_API_KEY=abcdefgh12\n\
             SHORT_TOKEN=tiny\n\
             SERVER_MODE=batch\n",
        );
        let resolver = ConfigResolver::with_env(file.path(), &HashMap::new());

        let snapshot = resolver.snapshot_masked();
        assert_eq!(snapshot["ELEVENLABS_API_KEY"], "abcd...gh12");
        assert_eq!(snapshot["SHORT_TOKEN"], "***");
        assert_eq!(snapshot["SERVER_MODE"], "batch");
    }

    #[test]
    fn test_missing_settings_file_is_not_an_error() {
        let env = env_of(&[("GROK_API_KEY", "grk-123456789")]);
        let resolver = ConfigResolver::with_env("/nonexistent/env.config", &env);
        assert_eq!(
            resolver.secret_for("grok").as_deref(),
            Some("grk-123456789")
        );
    }

    #[test]
    fn test_install_and_reset_swap_the_global() {
        let file = settings_file("DEEPGRAM_API_KEY=install-test-1\n");
        let installed = install(ConfigResolver::with_env(file.path(), &HashMap::new()));
        assert_eq!(
            installed.get("DEEPGRAM_API_KEY").as_deref(),
            Some("install-test-1")
        );
        // global() hands back the installed instance, not a fresh load
        assert_eq!(
            global().get("DEEPGRAM_API_KEY").as_deref(),
            Some("install-test-1")
        );

        reset();
        // next access lazily builds a new resolver from the default path
        let fresh = global();
        assert!(!std::ptr::eq(installed.as_ref(), fresh.as_ref()));
    }
}
