//! Mock backends for testing
//!
//! Provides scripted and rule-based implementations of the ChatBackend trait
//! for exercising retry, normalization, and dispatch paths without a network.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use secdb_classifiers::{BackendError, BackendFactory, ChatBackend};
use secdb_core::ChatMessage;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Returns queued replies in order, then a fixed fallback
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Result<String, BackendError>>>,
    fallback: String,
    call_count: AtomicU32,
}

impl ScriptedBackend {
    pub fn new(replies: Vec<Result<String, BackendError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            fallback: "<xml>none</xml>".to_string(),
            call_count: AtomicU32::new(0),
        }
    }

    /// Always reply with the same content
    pub fn answering(content: &str) -> Self {
        Self::new(Vec::new()).with_fallback(content)
    }

    pub fn with_fallback(mut self, content: &str) -> Self {
        self.fallback = content.to_string();
        self
    }

    /// Get the number of times complete was called
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn complete(&self, _messages: &[ChatMessage]) -> Result<String, BackendError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        self.replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(self.fallback.clone()))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Answers based on keywords in the comment text.
///
/// - `PANIC` panics inside the worker
/// - `RATELIMIT` always fails with a rate limit
/// - `REJECT` fails with a bad request
/// - `GARBAGE` returns unsalvageable output
/// - `password` answers `credentials`, `@` answers `pii`
/// - anything else answers `none`
///
/// An optional latency derived from the text length shuffles completion order.
pub struct KeywordBackend {
    latency_step: Option<Duration>,
    calls: Arc<AtomicUsize>,
}

impl KeywordBackend {
    /// The comment without the preamble, for either prompt layout
    fn comment(messages: &[ChatMessage]) -> &str {
        let content = messages.last().map(|m| m.content.as_str()).unwrap_or("");
        match content
            .strip_suffix("\n---")
            .and_then(|body| body.rsplit_once("\n---\n"))
        {
            Some((_, comment)) => comment,
            None => content,
        }
    }
}

#[async_trait]
impl ChatBackend for KeywordBackend {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, BackendError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let text = Self::comment(messages);

        if let Some(step) = self.latency_step {
            let jitter = (text.len() % 7) as u32;
            tokio::time::sleep(step * jitter).await;
        }

        if text.contains("PANIC") {
            panic!("simulated worker crash");
        }
        if text.contains("RATELIMIT") {
            return Err(BackendError::RateLimited("quota exceeded".to_string()));
        }
        if text.contains("REJECT") {
            return Err(BackendError::BadRequest("context length exceeded".to_string()));
        }
        if text.contains("GARBAGE") {
            return Ok("<<<>>> ??? !!!".to_string());
        }

        let mut labels = Vec::new();
        if text.contains("password") {
            labels.push("credentials");
        }
        if text.contains('@') {
            labels.push("pii");
        }
        if labels.is_empty() {
            labels.push("none");
        }
        Ok(format!("Reasoning omitted.\n<xml>{}</xml>", labels.join(",")))
    }

    fn name(&self) -> &str {
        "keyword"
    }
}

/// Hands out a fresh KeywordBackend per worker and counts connections
#[derive(Default)]
pub struct KeywordFactory {
    latency_step: Option<Duration>,
    connects: AtomicUsize,
    calls: Arc<AtomicUsize>,
}

impl KeywordFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency_step(mut self, step: Duration) -> Self {
        self.latency_step = Some(step);
        self
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::Relaxed)
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl BackendFactory for KeywordFactory {
    fn connect(&self) -> Result<Box<dyn ChatBackend>, BackendError> {
        self.connects.fetch_add(1, Ordering::Relaxed);
        Ok(Box::new(KeywordBackend {
            latency_step: self.latency_step,
            calls: Arc::clone(&self.calls),
        }))
    }
}

/// Fails the first `failures` connects, then serves scripted backends
pub struct FlakyFactory {
    failures: AtomicUsize,
    content: String,
}

impl FlakyFactory {
    pub fn new(failures: usize, content: &str) -> Self {
        Self {
            failures: AtomicUsize::new(failures),
            content: content.to_string(),
        }
    }
}

impl BackendFactory for FlakyFactory {
    fn connect(&self) -> Result<Box<dyn ChatBackend>, BackendError> {
        let remaining = self.failures.load(Ordering::Relaxed);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::Relaxed);
            return Err(BackendError::Transport("connection refused".to_string()));
        }
        Ok(Box::new(ScriptedBackend::answering(&self.content)))
    }
}
