//! Watch-list, push updates and acknowledgements

use crate::common::consumer::summary;
use crate::common::{fast_options, TestConsumer};
use delivery::Producer;
use fwatch_core::{path, ProjectWatchConfig};
use registry::WatchState;
use snapshot::SnapshotStore;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;

const TIMEOUT: Duration = Duration::from_secs(10);

async fn wait_until(timeout: Duration, check: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_filter_update_is_pushed_and_acked() -> anyhow::Result<()> {
    let root = TempDir::new()?;
    let consumer = TestConsumer::start().await?;
    let first = consumer.register("p1", root.path(), &[]);

    let producer = Producer::start(fast_options(&consumer.url), Arc::new(SnapshotStore::temporary()?))?;
    assert!(
        consumer
            .wait_for_state("p1", &first.watch_state_id, WatchState::Watching, TIMEOUT)
            .await
    );
    // Later updates arrive over the push session
    assert!(wait_until(TIMEOUT, || consumer.state.sessions.len() == 1).await);

    let second = consumer.register("p1", root.path(), &["*.tmp"]);
    assert_ne!(first.watch_state_id, second.watch_state_id);

    assert!(
        consumer
            .wait_for_state("p1", &second.watch_state_id, WatchState::Watching, TIMEOUT)
            .await,
        "updated watch state was never acknowledged"
    );
    assert_eq!(
        producer.projects().config("p1").map(|c| c.ignored_filenames),
        Some(vec!["*.tmp".to_string()])
    );

    // The new filter applies to later cycles
    tokio::time::sleep(Duration::from_millis(300)).await;
    std::fs::write(root.path().join("scratch.tmp"), "x")?;
    std::fs::write(root.path().join("kept.txt"), "x")?;
    let events = consumer
        .wait_for("p1", TIMEOUT, |events| {
            events.iter().any(|e| e.path.as_str() == "/kept.txt")
        })
        .await;
    assert_eq!(summary(&events), vec![('+', "/kept.txt".to_string())]);
    assert!(!consumer.state.sink.flags().has_ack_flip);

    producer.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_add_and_delete_reach_the_producer() -> anyhow::Result<()> {
    let a = TempDir::new()?;
    let b = TempDir::new()?;
    let consumer = TestConsumer::start().await?;
    consumer.register("a", a.path(), &[]);

    let producer = Producer::start(fast_options(&consumer.url), Arc::new(SnapshotStore::temporary()?))?;
    assert!(wait_until(TIMEOUT, || producer.projects().project_ids() == vec!["a".to_string()]).await);
    assert!(wait_until(TIMEOUT, || consumer.state.sessions.len() == 1).await);

    let added = consumer.register("b", b.path(), &[]);
    assert!(
        consumer
            .wait_for_state("b", &added.watch_state_id, WatchState::Watching, TIMEOUT)
            .await
    );
    assert_eq!(producer.projects().project_ids(), vec!["a".to_string(), "b".to_string()]);

    assert!(consumer.state.registry.unregister("a"));
    assert!(wait_until(TIMEOUT, || producer.projects().project_ids() == vec!["b".to_string()]).await);

    producer.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_missing_root_is_still_watched() -> anyhow::Result<()> {
    let consumer = TestConsumer::start().await?;

    let mut config = ProjectWatchConfig::new("p1", path::normalize("/nonexistent/fwatch").as_str());
    config.ignored_filenames = vec!["*.log".to_string()];
    let registered = consumer.state.registry.register(config)?;

    let producer = Producer::start(fast_options(&consumer.url), Arc::new(SnapshotStore::temporary()?))?;

    // The root may appear later
    assert!(
        consumer
            .wait_for_state("p1", &registered.watch_state_id, WatchState::Watching, TIMEOUT)
            .await
    );
    assert!(!consumer.state.sink.flags().any());

    producer.shutdown().await;
    Ok(())
}
