//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    extract::State,
    http::{Method, StatusCode, Uri},
    Router,
};
use tokio::net::TcpListener;

use feed_capture::config::CaptureConfig;

/// One request seen by the mock feed API.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub body: String,
}

type Responder = dyn Fn(&RecordedCall) -> (u16, String) + Send + Sync;

#[derive(Clone)]
struct MockState {
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    respond: Arc<Responder>,
}

/// A programmable stand-in for the live feed API.
pub struct MockFeed {
    pub addr: SocketAddr,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

#[allow(dead_code)]
impl MockFeed {
    /// Base URL to configure as `feed.api_url`.
    pub fn api_url(&self) -> String {
        format!("http://{}/live/feed/v0.1", self.addr)
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// `(METHOD, path)` pairs in arrival order.
    pub fn routes(&self) -> Vec<(String, String)> {
        self.calls()
            .into_iter()
            .map(|c| (c.method.to_string(), c.path))
            .collect()
    }
}

/// Start a mock feed API answering every request through `respond`.
pub async fn start_mock_feed<F>(respond: F) -> MockFeed
where
    F: Fn(&RecordedCall) -> (u16, String) + Send + Sync + 'static,
{
    let calls = Arc::new(Mutex::new(Vec::new()));
    let state = MockState {
        calls: calls.clone(),
        respond: Arc::new(respond),
    };

    let app = Router::new().fallback(mock_handler).with_state(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    MockFeed { addr, calls }
}

async fn mock_handler(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    body: String,
) -> (StatusCode, String) {
    let call = RecordedCall {
        method,
        path: uri.path().to_string(),
        body,
    };
    let (status, reply) = (state.respond)(&call);
    state.calls.lock().unwrap().push(call);
    (
        StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        reply,
    )
}

/// Configuration pointing at `feed`, listening on an ephemeral port and
/// writing below `output_dir`.
#[allow(dead_code)]
pub fn test_config(feed: &MockFeed, output_dir: &std::path::Path) -> CaptureConfig {
    let mut config = CaptureConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.feed.api_url = feed.api_url();
    config.feed.use_system_proxy = false;
    config.feed.request_timeout_secs = 5;
    config.output.directory = output_dir.join("events").to_string_lossy().into_owned();
    config
}
