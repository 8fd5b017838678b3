//! `fwd` operator commands against an in-process consumer

use crate::common::TestConsumer;
use crate::fwd;
use fwatch_core::path;
use registry::WatchState;
use tempfile::TempDir;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_project_add_list_remove() -> anyhow::Result<()> {
    let root = TempDir::new()?;
    let consumer = TestConsumer::start().await?;
    let root_arg = root.path().to_string_lossy().to_string();

    let added = fwd!(
        "project", "add", "p1", &root_arg,
        "--ignore-path", "/target/*",
        "--ignore-filename", "*.class",
        "--server", &consumer.url
    )
    .assert_success()
    .await?;
    assert!(added.contains_stdout("Registered"));

    let config = consumer.state.registry.config("p1").expect("registered");
    assert_eq!(config.local_root, path::normalize(&root_arg).as_str());
    assert_eq!(config.ignored_paths, vec!["/target/*".to_string()]);
    assert_eq!(config.ignored_filenames, vec!["*.class".to_string()]);
    assert!(added.contains_stdout(&config.watch_state_id));

    let listed = fwd!("list", "--server", &consumer.url).assert_success().await?;
    assert!(listed.contains_stdout("p1"));
    assert!(listed.contains_stdout("*.class"));

    let status = fwd!("project", "status", "p1", "--server", &consumer.url)
        .assert_success()
        .await?;
    assert!(status.contains_stdout("pending ack"));
    assert_eq!(consumer.state.registry.status("p1").map(|s| s.state), Some(WatchState::PendingAck));

    fwd!("project", "remove", "p1", "--server", &consumer.url)
        .assert_success()
        .await?;
    assert!(consumer.state.registry.config("p1").is_none());

    let missing = fwd!("project", "remove", "p1", "--server", &consumer.url)
        .assert_failure()
        .await?;
    assert!(missing.contains_stderr("not registered"));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_malformed_filter_is_rejected_locally() -> anyhow::Result<()> {
    let consumer = TestConsumer::start().await?;
    let root = TempDir::new()?;
    let root_arg = root.path().to_string_lossy().to_string();

    fwd!(
        "project", "add", "p1", &root_arg,
        "--ignore-filename", "dir/name",
        "--server", &consumer.url
    )
    .assert_failure()
    .await?;
    assert!(consumer.state.registry.config("p1").is_none());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_config_file_supplies_server() -> anyhow::Result<()> {
    let consumer = TestConsumer::start().await?;
    let dir = TempDir::new()?;
    let config_path = dir.path().join("config.toml");
    std::fs::write(
        &config_path,
        format!("[producer]\nserver_url = \"{}\"\n", consumer.url),
    )?;

    let listed = fwd!("list").config(&config_path).assert_success().await?;
    assert!(listed.contains_stdout("No projects registered"));
    Ok(())
}
