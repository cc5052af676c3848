//! Work items and outcomes
//!
//! The value types that flow through a router: one request type per
//! operation class, plus the tagged per-item `Outcome` used by batch calls.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Maximum characters of a work item shown in log fields.
const LABEL_CHARS: usize = 48;

// ============================================================================
// Work item contract
// ============================================================================

/// One unit of input to be processed by a backend.
///
/// Implementations are immutable, owned value objects. `label` is a short
/// human-readable tag used in log fields, never for dispatch.
pub trait WorkItem: Send + Sync + 'static {
    fn label(&self) -> String;
}

// ============================================================================
// Text generation
// ============================================================================

/// A text-generation request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The user prompt.
    pub prompt: String,
    /// Optional system instructions sent ahead of the prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// Per-call parameter overrides (e.g. `temperature`). These win over the
    /// adapter configuration for this call only.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, Value>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Flatten a chat transcript into a single request.
    ///
    /// System messages are collected into `system`; user turns are joined
    /// verbatim and assistant turns are prefixed, so the dialogue stays
    /// readable for backends without a native chat endpoint.
    pub fn from_messages(messages: &[ChatMessage]) -> Self {
        let mut system_parts = Vec::new();
        let mut dialogue = Vec::new();
        for message in messages {
            match message.role {
                ChatRole::System => system_parts.push(message.content.clone()),
                ChatRole::User => dialogue.push(message.content.clone()),
                ChatRole::Assistant => dialogue.push(format!("Assistant: {}", message.content)),
            }
        }
        Self {
            prompt: dialogue.join("\n"),
            system: if system_parts.is_empty() {
                None
            } else {
                Some(system_parts.join("\n"))
            },
            params: BTreeMap::new(),
        }
    }
}

impl WorkItem for GenerationRequest {
    fn label(&self) -> String {
        truncate_label(&self.prompt)
    }
}

// ============================================================================
// Chat transcripts
// ============================================================================

/// Role of one chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One turn of a chat transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

// ============================================================================
// Audio transcription
// ============================================================================

/// An audio-transcription request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionRequest {
    /// Path to the audio input; must exist and be readable at execution time.
    pub source: PathBuf,
}

impl TranscriptionRequest {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

impl WorkItem for TranscriptionRequest {
    fn label(&self) -> String {
        self.source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.source.display().to_string())
    }
}

// ============================================================================
// Outcomes
// ============================================================================

/// Per-item result of a batch call.
///
/// A failed slot carries its reason instead of a sentinel empty string, so
/// empty `Success` text is always genuine backend output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Success { text: String },
    Failure { reason: String },
}

impl Outcome {
    pub fn success(text: impl Into<String>) -> Self {
        Outcome::Success { text: text.into() }
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        Outcome::Failure {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    /// Text of a successful slot.
    pub fn text(&self) -> Option<&str> {
        match self {
            Outcome::Success { text } => Some(text),
            Outcome::Failure { .. } => None,
        }
    }

    /// Reason of a failed slot.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Outcome::Success { .. } => None,
            Outcome::Failure { reason } => Some(reason),
        }
    }
}

/// Truncate at a character boundary; newlines flatten to spaces and the cut
/// is marked.
fn truncate_label(text: &str) -> String {
    let flat = text.replace('\n', " ");
    match flat.char_indices().nth(LABEL_CHARS) {
        Some((idx, _)) => format!("{}...", &flat[..idx]),
        None => flat,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_messages_flattens_roles() {
        let messages = vec![
            ChatMessage::system("Be terse."),
            ChatMessage::user("Hello"),
            ChatMessage::assistant("Hi there"),
            ChatMessage::user("Summarize the meeting"),
        ];

        let request = GenerationRequest::from_messages(&messages);
        assert_eq!(request.system.as_deref(), Some("Be terse."));
        assert_eq!(
            request.prompt,
            "Hello\nAssistant: Hi there\nSummarize the meeting"
        );
        assert!(request.params.is_empty());
    }

    #[test]
    fn test_from_messages_without_system() {
        let request = GenerationRequest::from_messages(&[ChatMessage::user("Hello")]);
        assert_eq!(request.system, None);
        assert_eq!(request.prompt, "Hello");
    }

    #[test]
    fn test_generation_label_truncates() {
        let request = GenerationRequest::new("x".repeat(100));
        let label = request.label();
        assert_eq!(label.chars().count(), LABEL_CHARS + 3);
        assert!(label.ends_with("..."));

        let short = GenerationRequest::new("short prompt");
        assert_eq!(short.label(), "short prompt");
    }

    #[test]
    fn test_transcription_label_uses_file_name() {
        let request = TranscriptionRequest::new("/tmp/uploads/meeting.wav");
        assert_eq!(request.label(), "meeting.wav");
    }

    #[test]
    fn test_outcome_tags() {
        let ok = Outcome::success("hello");
        assert!(ok.is_success());
        assert_eq!(ok.text(), Some("hello"));
        assert_eq!(ok.reason(), None);

        let failed = Outcome::failure("quota exceeded");
        assert!(!failed.is_success());
        assert_eq!(failed.text(), None);
        assert_eq!(failed.reason(), Some("quota exceeded"));
    }

    #[test]
    fn test_outcome_serialization_is_tagged() {
        let json = serde_json::to_value(Outcome::success("")).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["text"], "");

        let json = serde_json::to_value(Outcome::failure("nope")).unwrap();
        assert_eq!(json["status"], "failure");
        assert_eq!(json["reason"], "nope");
    }

    #[test]
    fn test_builder_params() {
        let request = GenerationRequest::new("hi")
            .with_system("system")
            .with_param("temperature", 0.2)
            .with_param("model", "test-model");
        assert_eq!(request.params.len(), 2);
        assert_eq!(request.params["model"], "test-model");
    }
}
