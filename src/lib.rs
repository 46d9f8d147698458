//! Prompt Visualizer client orchestration
//!
//! This crate provides:
//! - A typed client for the Prompt Visualizer backend API
//! - Chat orchestration across single-model, comparison and
//!   version-comparison dispatch modes
//! - Session state with reducer-style transitions
//! - Highlight rendering over semantic-diff chunks

pub mod backend;
pub mod dispatch;
pub mod highlight;
pub mod orchestrator;
pub mod registry;
pub mod session;

pub use backend::{ChatBackend, HttpBackend};
pub use highlight::{apply_highlights, Span};
pub use orchestrator::ChatOrchestrator;
pub use registry::{DispatchMode, ModelOption};
pub use session::{Message, Role, SessionState};

/// Configuration for the client
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ClientConfig {
    /// Backend origin
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// How many trailing turns accompany each chat request
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Request timeout (seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Minimum query length before suggestions are fetched
    #[serde(default = "default_min_suggestion_len")]
    pub min_suggestion_len: usize,
}

fn default_base_url() -> String {
    backend::DEFAULT_BASE_URL.to_string()
}
fn default_history_window() -> usize {
    6
}
fn default_request_timeout_secs() -> u64 {
    300
}
fn default_min_suggestion_len() -> usize {
    2
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            history_window: default_history_window(),
            request_timeout_secs: default_request_timeout_secs(),
            min_suggestion_len: default_min_suggestion_len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config: ClientConfig = toml::from_str("").unwrap();
        assert_eq!(config.base_url, "http://127.0.0.1:5000");
        assert_eq!(config.history_window, 6);
        assert_eq!(config.min_suggestion_len, 2);
    }

    #[test]
    fn test_config_overrides() {
        let config: ClientConfig = toml::from_str(
            r#"
            base_url = "http://backend:5000"
            history_window = 10
            "#,
        )
        .unwrap();
        assert_eq!(config.base_url, "http://backend:5000");
        assert_eq!(config.history_window, 10);
        assert_eq!(config.request_timeout_secs, 300);
    }
}
