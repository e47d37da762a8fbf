//! Concurrent dispatcher ordering and fault isolation

mod common;

use common::KeywordFactory;
use parking_lot::Mutex;
use secdb_classifiers::{
    ClassificationClient, DispatchConfig, Dispatcher, PromptMode, PromptTemplate,
    ResponseNormalizer, RetryPolicy,
};
use secdb_core::{
    ClassificationResult, CommentRecord, CompletionObserver, Label, LabelSet, NoopObserver,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Records the identifiers in the order completions were reported
#[derive(Default)]
struct RecordingObserver {
    completed: Mutex<Vec<usize>>,
}

impl CompletionObserver for RecordingObserver {
    fn on_complete(&self, record: &CommentRecord, result: &ClassificationResult) {
        assert_eq!(record.identifier, result.identifier);
        self.completed.lock().push(result.identifier);
    }
}

fn dispatcher(factory: Arc<KeywordFactory>, workers: usize, mode: PromptMode) -> Dispatcher {
    let client = ClassificationClient::new(
        PromptTemplate::new("Classify:", mode),
        ResponseNormalizer::default(),
        RetryPolicy::new(3, Duration::from_millis(10), 1.7).unwrap(),
    );
    Dispatcher::new(client, factory, DispatchConfig { workers }).unwrap()
}

fn records(texts: &[&str]) -> Arc<[CommentRecord]> {
    texts
        .iter()
        .enumerate()
        .map(|(i, text)| CommentRecord::new(i, *text, LabelSet::new()))
        .collect::<Vec<_>>()
        .into()
}

fn numbered_records(n: usize) -> Arc<[CommentRecord]> {
    (0..n)
        .map(|i| {
            let text = match i % 3 {
                0 => format!("comment {} mentions password", i),
                1 => format!("comment {} from a{}@example.org", i, i),
                _ => format!("comment {}{}", i, "!".repeat(i % 5)),
            };
            CommentRecord::new(i, text, LabelSet::new())
        })
        .collect::<Vec<_>>()
        .into()
}

#[tokio::test(start_paused = true)]
async fn test_every_record_gets_exactly_one_result() {
    for n in [0usize, 1, 50] {
        for workers in [1usize, 4, 50] {
            let factory = Arc::new(KeywordFactory::new().with_latency_step(Duration::from_millis(3)));
            let observer = Arc::new(RecordingObserver::default());
            let input = numbered_records(n);

            let results = dispatcher(factory.clone(), workers, PromptMode::Inline)
                .run(Arc::clone(&input), observer.clone())
                .await
                .unwrap();

            assert_eq!(results.len(), n, "n={} workers={}", n, workers);
            for (position, result) in results.iter().enumerate() {
                assert_eq!(result.identifier, position);
                assert!(result.error.is_none());
            }

            let completed = observer.completed.lock().clone();
            assert_eq!(completed.len(), n);
            let unique: HashSet<_> = completed.iter().copied().collect();
            assert_eq!(unique.len(), n);

            assert_eq!(factory.call_count(), n);
            assert!(factory.connect_count() <= workers.min(n.max(1)));
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_results_follow_input_order_not_completion_order() {
    let factory = Arc::new(KeywordFactory::new().with_latency_step(Duration::from_millis(50)));
    let observer = Arc::new(RecordingObserver::default());
    // Latency steps 5, 3, 1 (length mod 7), so completion order reverses
    let input = records(&["the password", "x@y", "x"]);

    let results = dispatcher(factory, 3, PromptMode::System)
        .run(input, observer.clone())
        .await
        .unwrap();

    assert_eq!(results[0].predicted_labels, LabelSet::from(vec![Label::Credentials]));
    assert_eq!(results[1].predicted_labels, LabelSet::from(vec![Label::Pii]));
    assert!(results[2].predicted_labels.is_empty());

    assert_eq!(*observer.completed.lock(), vec![2, 1, 0]);
}

#[tokio::test(start_paused = true)]
async fn test_failures_stay_local_to_their_record() {
    let factory = Arc::new(KeywordFactory::new());
    let input = records(&[
        "password: hunter2",
        "RATELIMIT every time",
        "PANIC now",
        "REJECT this",
        "GARBAGE out",
        "",
        "mail me at jane@example.org",
    ]);

    let results = dispatcher(factory.clone(), 2, PromptMode::Inline)
        .run(input, Arc::new(NoopObserver))
        .await
        .unwrap();

    assert_eq!(results.len(), 7);

    assert_eq!(results[0].predicted_labels, LabelSet::from(vec![Label::Credentials]));
    assert!(results[0].error.is_none());

    assert!(results[1].error.as_deref().unwrap().starts_with("RateLimitError"));
    assert!(results[1].predicted_labels.is_empty());

    assert!(results[2].error.as_deref().unwrap().starts_with("worker fault"));
    assert!(results[2].error.as_deref().unwrap().contains("simulated worker crash"));

    assert!(results[3].error.as_deref().unwrap().starts_with("BadRequestError"));

    assert!(results[4].error.as_deref().unwrap().contains("no valid <xml>"));
    assert!(results[4].predicted_labels.is_empty());

    assert!(results[5].error.is_none());
    assert!(results[5].note.is_some());

    assert_eq!(results[6].predicted_labels, LabelSet::from(vec![Label::Pii]));

    // 1 + 3 rate-limited attempts + 1 panic + 1 reject + 1 garbage + 1 pii
    assert_eq!(factory.call_count(), 8);
}

#[tokio::test]
async fn test_invalid_identifiers_rejected() {
    let factory = Arc::new(KeywordFactory::new());
    let input: Arc<[CommentRecord]> = vec![
        CommentRecord::new(0, "a", LabelSet::new()),
        CommentRecord::new(0, "b", LabelSet::new()),
    ]
    .into();

    let outcome = dispatcher(factory.clone(), 2, PromptMode::Inline)
        .run(input, Arc::new(NoopObserver))
        .await;

    assert!(outcome.is_err());
    assert_eq!(factory.call_count(), 0);
}

#[tokio::test]
async fn test_zero_workers_rejected() {
    let client = ClassificationClient::default();
    let factory = Arc::new(KeywordFactory::new());
    assert!(Dispatcher::new(client, factory, DispatchConfig { workers: 0 }).is_err());
}
