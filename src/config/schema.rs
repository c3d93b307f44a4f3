//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the capture
//! bridge. All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Event categories understood by the v0.1 live feed.
pub const DEFAULT_CATEGORIES: &[&str] = &[
    "DIRECTORY_BLOCK_COMMIT",
    "CHAIN_COMMIT",
    "ENTRY_COMMIT",
    "ENTRY_REVEAL",
    "STATE_CHANGE",
    "NODE_MESSAGE",
    "PROCESS_MESSAGE",
];

/// Root configuration for the capture bridge.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CaptureConfig {
    /// Callback listener settings.
    pub listener: ListenerConfig,

    /// Remote feed API and subscription settings.
    pub feed: FeedConfig,

    /// Where and how captured events are written.
    pub output: OutputConfig,

    /// Which failures terminate the process.
    pub errors: ErrorPolicyConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8787").
    pub bind_address: String,

    /// Path the feed pushes callbacks to.
    pub callback_path: String,

    /// Maximum callback body size in bytes.
    pub max_body_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8787".to_string(),
            callback_path: "/callback".to_string(),
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Which endpoint removes a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnsubscribeRoute {
    /// `DELETE {api}/subscriptions/{id}`
    #[default]
    Subscriptions,
    /// `DELETE {api}/unsubscribe/{id}`
    Unsubscribe,
}

/// Feed API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Base URL of the live feed API.
    pub api_url: String,

    /// Externally reachable URL of our callback endpoint.
    pub callback_url: String,

    /// Existing subscription to update instead of creating a new one.
    pub subscription_id: Option<String>,

    /// Event categories to subscribe to.
    pub categories: Vec<String>,

    /// Timeout for each subscription request in seconds.
    pub request_timeout_secs: u64,

    /// Honour HTTP(S)_PROXY environment variables.
    pub use_system_proxy: bool,

    /// Endpoint used to delete the subscription.
    pub unsubscribe_route: UnsubscribeRoute,

    /// Delete the subscription when the process stops.
    pub unsubscribe_on_shutdown: bool,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:8700/live/feed/v0.1".to_string(),
            callback_url: "http://127.0.0.1:8787/callback".to_string(),
            subscription_id: None,
            categories: DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect(),
            request_timeout_secs: 30,
            use_system_proxy: true,
            unsubscribe_route: UnsubscribeRoute::default(),
            unsubscribe_on_shutdown: true,
        }
    }
}

/// Output store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory holding one `<category>.json` per event category.
    pub directory: String,

    /// Permission bits for event files (unix only, still subject to umask).
    pub file_mode: u32,

    /// Permission bits for created directories (unix only).
    pub dir_mode: u32,

    /// Write through a temp file and rename instead of truncating in place.
    pub atomic_writes: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: "events".to_string(),
            file_mode: 0o640,
            dir_mode: 0o750,
            atomic_writes: true,
        }
    }
}

/// What to do when a recoverable startup step fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ErrorAction {
    /// Log and keep running.
    #[default]
    Continue,
    /// Log and stop the process.
    Terminate,
}

/// Error policy for startup steps that are not inherently fatal.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ErrorPolicyConfig {
    /// Output directory could not be created.
    pub on_directory_error: ErrorAction,

    /// Subscription could not be registered.
    pub on_subscription_error: ErrorAction,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins if set.
    pub log_level: String,

    /// Single-line log output.
    pub compact_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            compact_logs: false,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
