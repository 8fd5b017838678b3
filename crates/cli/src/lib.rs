//! Library side of the `fwd` binary
//!
//! Configuration loading and logging setup, shared by the binary and the
//! integration tests.

pub mod config;
pub mod logging;

pub use config::FwatchConfig;
