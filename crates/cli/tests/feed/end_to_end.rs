//! Create and delete flow through a real producer and consumer

use crate::common::consumer::summary;
use crate::common::{fast_options, TestConsumer};
use delivery::Producer;
use registry::WatchState;
use snapshot::SnapshotStore;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_create_then_delete_is_delivered() -> anyhow::Result<()> {
    let root = TempDir::new()?;
    std::fs::write(root.path().join("existing.txt"), "seeded")?;

    let consumer = TestConsumer::start().await?;
    let registered = consumer.register("p1", root.path(), &[]);

    let store = Arc::new(SnapshotStore::temporary()?);
    let producer = Producer::start(fast_options(&consumer.url), store)?;

    assert!(
        consumer
            .wait_for_state("p1", &registered.watch_state_id, WatchState::Watching, TIMEOUT)
            .await,
        "producer never acknowledged the watch"
    );

    // Let the first cycle seed the snapshot
    tokio::time::sleep(Duration::from_millis(400)).await;
    std::fs::write(root.path().join("a.txt"), "hello")?;

    let events = consumer
        .wait_for("p1", TIMEOUT, |events| !events.is_empty())
        .await;
    assert_eq!(summary(&events), vec![('+', "/a.txt".to_string())]);
    assert!(!events[0].is_directory);

    std::fs::remove_file(root.path().join("a.txt"))?;
    let events = consumer.wait_for("p1", TIMEOUT, |events| events.len() >= 2).await;
    assert_eq!(
        summary(&events),
        vec![('+', "/a.txt".to_string()), ('-', "/a.txt".to_string())]
    );

    // The seeded file was never reported
    assert!(events.iter().all(|e| e.path.as_str() != "/existing.txt"));
    assert!(!consumer.state.sink.flags().any());

    producer.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_directory_and_nested_file() -> anyhow::Result<()> {
    let root = TempDir::new()?;
    let consumer = TestConsumer::start().await?;
    let registered = consumer.register("p1", root.path(), &["*.log"]);

    let producer = Producer::start(fast_options(&consumer.url), Arc::new(SnapshotStore::temporary()?))?;
    assert!(
        consumer
            .wait_for_state("p1", &registered.watch_state_id, WatchState::Watching, TIMEOUT)
            .await
    );
    tokio::time::sleep(Duration::from_millis(400)).await;

    std::fs::create_dir(root.path().join("src"))?;
    std::fs::write(root.path().join("src").join("main.rs"), "fn main() {}")?;
    std::fs::write(root.path().join("build.log"), "ignored")?;

    let events = consumer
        .wait_for("p1", TIMEOUT, |events| {
            events.iter().any(|e| e.path.as_str() == "/src/main.rs")
        })
        .await;

    let src = events.iter().find(|e| e.path.as_str() == "/src").expect("directory event");
    assert!(src.is_directory);
    assert!(events.iter().all(|e| e.path.as_str() != "/build.log"));

    let batches = consumer.state.sink.delivered_batches("p1");
    let timestamps: Vec<_> = batches.iter().map(|b| b.batch.batch_timestamp_millis).collect();
    assert!(timestamps.windows(2).all(|w| w[0] < w[1]));

    producer.shutdown().await;
    Ok(())
}
