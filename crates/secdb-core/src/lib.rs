//! SecDB Core
//!
//! Core types shared across the SecDB classification and scoring pipeline.
//!
//! This crate provides:
//! - The closed label taxonomy and the order-insensitive `LabelSet`
//! - Comment records and per-record classification results
//! - The completion observer hook used by the dispatcher
//! - Error types and result handling

pub mod error;
pub mod taxonomy;
pub mod types;

pub use error::{Error, Result};
pub use taxonomy::{Label, LabelSet, NONE_SENTINEL};
pub use types::{ChatMessage, ClassificationResult, CommentRecord, CompletionObserver, NoopObserver};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::taxonomy::{Label, LabelSet, NONE_SENTINEL};
    pub use crate::types::{ChatMessage, ClassificationResult, CommentRecord, CompletionObserver};
}
