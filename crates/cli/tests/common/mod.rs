//! Common utilities for integration tests

pub mod cli;
pub mod consumer;
pub mod transport;

// Re-export commonly used items
pub use consumer::{fast_options, TestConsumer};
pub use transport::FaultyTransport;
