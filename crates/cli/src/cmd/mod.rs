//! CLI command implementations

pub mod watch;
pub mod serve;
pub mod list;
pub mod project;

use cli_lib::FwatchConfig;
use delivery::ServerApi;

/// `--server` flag, else the configured producer URL
pub(crate) fn server_api(config: &FwatchConfig, server: Option<String>) -> ServerApi {
    ServerApi::new(server.as_deref().unwrap_or(&config.producer.server_url))
}
