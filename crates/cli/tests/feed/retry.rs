//! Delivery under injected transport failures

use crate::common::consumer::summary;
use crate::common::{fast_options, FaultyTransport, TestConsumer};
use delivery::Producer;
use registry::WatchState;
use snapshot::SnapshotStore;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const TIMEOUT: Duration = Duration::from_secs(15);

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failures_lose_and_reorder_nothing() -> anyhow::Result<()> {
    let root = TempDir::new()?;
    let consumer = TestConsumer::start().await?;
    let registered = consumer.register("p1", root.path(), &[]);

    let transport = Arc::new(FaultyTransport::new(&consumer.url, 0)?);
    let producer = Producer::start_with_transport(
        fast_options(&consumer.url),
        Arc::new(SnapshotStore::temporary()?),
        transport.clone(),
    )?;
    assert!(
        consumer
            .wait_for_state("p1", &registered.watch_state_id, WatchState::Watching, TIMEOUT)
            .await
    );
    tokio::time::sleep(Duration::from_millis(400)).await;

    // Each file lands in its own cycle; every first attempt fails
    for (i, name) in ["one.txt", "two.txt", "three.txt"].iter().enumerate() {
        transport.fail_next(3);
        std::fs::write(root.path().join(name), "data")?;
        let expected = i + 1;
        consumer
            .wait_for("p1", TIMEOUT, |events| events.len() >= expected)
            .await;
    }

    let events = consumer.state.sink.delivered("p1");
    assert_eq!(
        summary(&events),
        vec![
            ('+', "/one.txt".to_string()),
            ('+', "/two.txt".to_string()),
            ('+', "/three.txt".to_string()),
        ]
    );
    assert_eq!(transport.failed_attempts(), 9);

    let accepted = transport.accepted();
    assert_eq!(accepted.len(), 3);
    assert!(accepted.windows(2).all(|w| w[0] < w[1]));
    assert!(!consumer.state.sink.flags().any());

    producer.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_consumer_outage_is_retried() -> anyhow::Result<()> {
    let root = TempDir::new()?;
    let consumer = TestConsumer::start().await?;
    let registered = consumer.register("p1", root.path(), &[]);

    let transport = Arc::new(FaultyTransport::new(&consumer.url, 0)?);
    let producer = Producer::start_with_transport(
        fast_options(&consumer.url),
        Arc::new(SnapshotStore::temporary()?),
        transport.clone(),
    )?;
    assert!(
        consumer
            .wait_for_state("p1", &registered.watch_state_id, WatchState::Watching, TIMEOUT)
            .await
    );
    tokio::time::sleep(Duration::from_millis(400)).await;

    // Long enough to span several poll intervals
    transport.fail_next(25);
    std::fs::write(root.path().join("a.txt"), "a")?;
    tokio::time::sleep(Duration::from_millis(150)).await;
    std::fs::write(root.path().join("b.txt"), "b")?;

    let events = consumer.wait_for("p1", TIMEOUT, |events| events.len() >= 2).await;
    let paths: Vec<_> = summary(&events).into_iter().map(|(_, p)| p).collect();
    assert!(paths.contains(&"/a.txt".to_string()));
    assert!(paths.contains(&"/b.txt".to_string()));
    assert_eq!(events.len(), 2);
    assert!(!consumer.state.sink.flags().has_ordering_violation);

    producer.shutdown().await;
    Ok(())
}
