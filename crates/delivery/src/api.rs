//! Consumer endpoint addresses

/// URLs of one consumer server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerApi {
    /// Base URL without a trailing slash, e.g. `http://localhost:9090`
    base_url: String,
}

impl ServerApi {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST target for one batch
    pub fn file_changes_url(&self, project_id: &str, timestamp_millis: i64) -> String {
        format!(
            "{}/api/v1/projects/{}/file-changes?timestamp={}",
            self.base_url, project_id, timestamp_millis
        )
    }

    /// PUT target for a watch-state acknowledgement
    pub fn watch_status_url(&self, project_id: &str, watch_state_id: &str, client_uuid: &str) -> String {
        format!(
            "{}/api/v1/projects/{}/file-changes/{}/status?clientUuid={}",
            self.base_url, project_id, watch_state_id, client_uuid
        )
    }

    pub fn watch_list_url(&self) -> String {
        format!("{}/api/v1/projects/watchlist", self.base_url)
    }

    /// Operator endpoint for registering or removing one project
    pub fn project_watch_url(&self, project_id: &str) -> String {
        format!("{}/api/v1/projects/{}/watch", self.base_url, project_id)
    }

    /// Push channel address (`http` becomes `ws`, `https` becomes `wss`)
    pub fn websocket_url(&self) -> String {
        let ws_base = if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            self.base_url.clone()
        };
        format!("{}/websockets/file-changes/v1", ws_base)
    }
}
