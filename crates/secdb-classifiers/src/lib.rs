//! SecDB Classifiers
//!
//! LLM-backed multi-label classification of comments against the fixed
//! taxonomy.
//!
//! The pieces, leaf first:
//! - `normalize`: extracts and repairs the `<xml>` answer block, parses labels
//! - `prompt`: instruction preamble and message layout
//! - `backend`: chat completion endpoints and per-worker handle factories
//! - `retry`: bounded exponential backoff
//! - `client`: one classification with retry, plus the empty-input short-circuit
//! - `dispatcher`: fixed worker pool with positional result collection

pub mod backend;
pub mod client;
pub mod dispatcher;
pub mod normalize;
pub mod prompt;
pub mod retry;

pub use backend::{
    BackendConfig, BackendError, BackendFactory, ChatBackend, OpenAiBackendFactory,
    OpenAiChatBackend,
};
pub use client::{ClassificationClient, ClassifyError, LazyBackend};
pub use dispatcher::{DispatchConfig, Dispatcher};
pub use normalize::{
    parse_ground_truth, parse_label_tokens, NormalizeError, NormalizedAnswer, ResponseNormalizer,
};
pub use prompt::{PromptMode, PromptTemplate, DEFAULT_PREAMBLE};
pub use retry::RetryPolicy;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::backend::{BackendFactory, ChatBackend};
    pub use crate::client::ClassificationClient;
    pub use crate::dispatcher::{DispatchConfig, Dispatcher};
    pub use crate::normalize::{parse_ground_truth, ResponseNormalizer};
    pub use crate::prompt::PromptTemplate;
    pub use crate::retry::RetryPolicy;
}
