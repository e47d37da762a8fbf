//! Core types for SecDB

use crate::taxonomy::{LabelSet, NONE_SENTINEL};
use serde::{Deserialize, Serialize};

/// A chat message sent to the remote model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender (system, user, assistant)
    pub role: String,

    /// Content of the message
    pub content: String,
}

impl ChatMessage {
    /// Create a new chat message
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }
}

/// One unit of work: a comment to classify plus its stored ground truth.
///
/// Built once at load time and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct CommentRecord {
    /// Zero-based position in the input sequence
    pub identifier: usize,

    /// Free-form text to classify (may be empty)
    pub text: String,

    /// Ground-truth labels parsed from the stored taxonomy string
    pub ground_truth: LabelSet,

    /// The original input object, echoed back by the result writer
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl CommentRecord {
    /// Create a record with no extra fields
    pub fn new(identifier: usize, text: impl Into<String>, ground_truth: LabelSet) -> Self {
        Self {
            identifier,
            text: text.into(),
            ground_truth,
            fields: serde_json::Map::new(),
        }
    }

    /// Attach the original input object
    pub fn with_fields(mut self, fields: serde_json::Map<String, serde_json::Value>) -> Self {
        self.fields = fields;
        self
    }

    /// Whether there is anything to send to the model
    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

/// Pipeline output for one record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Identifier of the originating record
    pub identifier: usize,

    /// Sanitized `<xml>...</xml>` answer, empty when none was obtained
    pub raw_answer: String,

    /// Predicted labels (empty means `none`)
    pub predicted_labels: LabelSet,

    /// Set when no usable answer was obtained
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Non-fatal remark, e.g. the record had no text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,

    /// Length of the classified text in characters
    pub comment_length: usize,
}

impl ClassificationResult {
    /// A usable answer was obtained
    pub fn answered(
        identifier: usize,
        raw_answer: impl Into<String>,
        predicted_labels: LabelSet,
        comment_length: usize,
    ) -> Self {
        Self {
            identifier,
            raw_answer: raw_answer.into(),
            predicted_labels,
            error: None,
            note: None,
            comment_length,
        }
    }

    /// Terminal failure for this record
    pub fn failed(identifier: usize, error: impl Into<String>, comment_length: usize) -> Self {
        Self {
            identifier,
            raw_answer: String::new(),
            predicted_labels: LabelSet::new(),
            error: Some(error.into()),
            note: None,
            comment_length,
        }
    }

    /// Record had no text; no remote call was made
    pub fn empty_input(identifier: usize) -> Self {
        Self {
            identifier,
            raw_answer: format!("<xml>{}</xml>", NONE_SENTINEL),
            predicted_labels: LabelSet::new(),
            error: None,
            note: Some("missing or empty comment text".to_string()),
            comment_length: 0,
        }
    }

    /// An internal fault inside a dispatcher worker
    pub fn worker_fault(identifier: usize, detail: impl AsRef<str>) -> Self {
        Self::failed(identifier, format!("worker fault: {}", detail.as_ref()), 0)
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Hook invoked once per record as results complete.
///
/// Calls arrive in completion order from many workers at once.
pub trait CompletionObserver: Send + Sync {
    fn on_complete(&self, record: &CommentRecord, result: &ClassificationResult);
}

/// Observer that ignores every completion
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl CompletionObserver for NoopObserver {
    fn on_complete(&self, _record: &CommentRecord, _result: &ClassificationResult) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::Label;

    #[test]
    fn test_has_text() {
        assert!(!CommentRecord::new(0, "", LabelSet::new()).has_text());
        assert!(!CommentRecord::new(1, " \n\t ", LabelSet::new()).has_text());
        assert!(CommentRecord::new(2, "password: hunter2", LabelSet::new()).has_text());
    }

    #[test]
    fn test_empty_input_result_is_not_an_error() {
        let result = ClassificationResult::empty_input(3);
        assert_eq!(result.identifier, 3);
        assert!(!result.is_error());
        assert!(result.note.is_some());
        assert!(result.predicted_labels.is_empty());
        assert_eq!(result.raw_answer, "<xml>none</xml>");
    }

    #[test]
    fn test_worker_fault_result() {
        let result = ClassificationResult::worker_fault(7, "task panicked");
        assert_eq!(result.error.as_deref(), Some("worker fault: task panicked"));
        assert!(result.predicted_labels.is_empty());
        assert!(result.raw_answer.is_empty());
    }

    #[test]
    fn test_answered_result() {
        let labels: LabelSet = vec![Label::Credentials].into();
        let result = ClassificationResult::answered(0, "<xml>credentials</xml>", labels.clone(), 30);
        assert!(!result.is_error());
        assert_eq!(result.predicted_labels, labels);
        assert_eq!(result.comment_length, 30);
    }

    #[test]
    fn test_chat_message_roles() {
        assert_eq!(ChatMessage::user("hi").role, "user");
        assert_eq!(ChatMessage::system("rules").role, "system");
    }
}
