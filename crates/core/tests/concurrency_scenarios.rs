//! Gate-saturation and cancellation scenarios.

mod common;

use std::time::Duration;

use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tubedigest_core::{FeedDocument, RunOutcome, DESCRIPTION_MARKER};

use common::{feed_xml, test_config, Harness};

fn three_entry_feed() -> String {
    feed_xml(&[
        ("https://www.youtube.com/watch?v=vid-1", "A", "One", "D1"),
        ("https://www.youtube.com/watch?v=vid-2", "B", "Two", "D2"),
        ("https://www.youtube.com/watch?v=vid-3", "C", "Three", "D3"),
    ])
}

#[tokio::test]
async fn test_subtitle_gate_limits_concurrent_fetches() {
    let mut config = test_config();
    config.jobs_subtitles = 1;
    let harness = Harness::with_config(config);
    harness.fetcher.set_delay(Duration::from_millis(20)).await;

    let mut document = FeedDocument::parse(&three_entry_feed()).unwrap();
    let outcome = harness
        .orchestrator
        .run(&mut document, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome, RunOutcome::Completed);
    // Never more than one extractor at a time, yet all three ran.
    assert_eq!(harness.fetcher.max_in_flight(), 1);
    assert_eq!(harness.fetcher.fetch_count().await, 3);
    for entry in document.entries() {
        assert!(entry.description.contains(DESCRIPTION_MARKER));
    }
}

#[tokio::test]
async fn test_request_gate_limits_concurrent_exchanges() {
    let mut config = test_config();
    config.jobs_requests = 1;
    let harness = Harness::with_config(config);
    harness.transport.set_delay(Duration::from_millis(20)).await;

    let mut document = FeedDocument::parse(&three_entry_feed()).unwrap();
    harness
        .orchestrator
        .run(&mut document, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(harness.transport.max_in_flight(), 1);
    assert_eq!(harness.transport.request_count().await, 3);
}

#[tokio::test]
async fn test_wide_gates_do_run_entries_concurrently() {
    let harness = Harness::new();
    harness.fetcher.set_delay(Duration::from_millis(30)).await;

    let mut document = FeedDocument::parse(&three_entry_feed()).unwrap();
    harness
        .orchestrator
        .run(&mut document, CancellationToken::new())
        .await
        .unwrap();

    // With capacity 5 the three fetches overlap.
    assert!(harness.fetcher.max_in_flight() > 1);
}

#[tokio::test]
async fn test_cancellation_mid_fetch_returns_promptly_and_cleanly() {
    let harness = Harness::new();
    // Long enough that both entries are still mid-fetch when the
    // signal arrives.
    harness.fetcher.set_delay(Duration::from_secs(30)).await;

    let xml = feed_xml(&[
        ("https://www.youtube.com/watch?v=vid-1", "A", "One", "D1"),
        ("https://www.youtube.com/watch?v=vid-2", "B", "Two", "D2"),
    ]);
    let mut document = FeedDocument::parse(&xml).unwrap();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let outcome = timeout(
        Duration::from_secs(2),
        harness.orchestrator.run(&mut document, cancel),
    )
    .await
    .expect("run should return promptly after cancellation")
    .unwrap();

    assert_eq!(outcome, RunOutcome::Cancelled);
    // Every permit was handed back and nothing was half-written.
    assert_eq!(
        harness.subtitle_gate.available(),
        harness.subtitle_gate.capacity()
    );
    assert_eq!(
        harness.request_gate.available(),
        harness.request_gate.capacity()
    );
    assert!(harness.summary_cache.is_empty().await);
    for entry in document.entries() {
        assert!(!entry.description.contains("LLM's result"));
    }
}

#[tokio::test]
async fn test_cancellation_before_any_work_is_a_clean_cancel() {
    let harness = Harness::new();
    harness.fetcher.set_delay(Duration::from_secs(30)).await;

    let mut document = FeedDocument::parse(&three_entry_feed()).unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = timeout(
        Duration::from_secs(2),
        harness.orchestrator.run(&mut document, cancel),
    )
    .await
    .expect("run should return promptly")
    .unwrap();
    assert_eq!(outcome, RunOutcome::Cancelled);
    assert!(harness.summary_cache.is_empty().await);
}
