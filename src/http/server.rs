//! Callback HTTP server.
//!
//! # Responsibilities
//! - Create Axum Router with the callback handler
//! - Wire up middleware (tracing, request ID)
//! - Bind server to listener and signal readiness
//! - Decode pushed events and hand every category to the event sink
//!
//! The feed gets `200 OK` whatever happens to the payload. Drops are visible
//! only in logs and metrics.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::ListenerConfig;
use crate::feed::Event;
use crate::http::request::{request_id_of, UuidRequestId};
use crate::net::{self, ListenerError};
use crate::observability::metrics;
use crate::store::EventSink;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub sink: Arc<dyn EventSink>,
    pub max_body_size: usize,
}

/// What happened to one callback body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Parsed; `written` categories stored, `failed` categories not.
    Accepted { written: usize, failed: usize },
    /// Not a valid event; nothing written.
    Rejected,
}

/// HTTP server receiving feed callbacks.
pub struct CallbackServer {
    router: Router,
    config: ListenerConfig,
}

impl CallbackServer {
    /// Create a new callback server writing to the given sink.
    pub fn new(config: ListenerConfig, sink: Arc<dyn EventSink>) -> Self {
        let state = AppState {
            sink,
            max_body_size: config.max_body_size,
        };
        let router = build_router(&config, state);
        Self { router, config }
    }

    /// Bind the configured address and start serving in the background.
    ///
    /// Returns once the socket is bound and the serve task is running, so the
    /// feed can be told about the callback URL straight away.
    pub async fn start(self, shutdown: broadcast::Receiver<()>) -> Result<ServerHandle, ListenerError> {
        let listener = net::bind(&self.config).await?;
        self.start_on(listener, shutdown).await
    }

    /// Start serving on an already bound listener.
    pub async fn start_on(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<ServerHandle, ListenerError> {
        let local_addr = listener.local_addr().map_err(ListenerError::Bind)?;
        let (ready_tx, ready_rx) = oneshot::channel();
        let router = self.router;

        let task = tokio::spawn(async move {
            let _ = ready_tx.send(());
            tracing::info!(address = %local_addr, "Callback server starting");

            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = shutdown.recv().await;
                })
                .await
                .map_err(ListenerError::Serve)?;

            tracing::info!("Callback server stopped");
            Ok::<(), ListenerError>(())
        });

        ready_rx.await.map_err(|_| ListenerError::NotReady)?;
        Ok(ServerHandle { local_addr, task })
    }

    /// The configured router, for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

/// A running callback server.
pub struct ServerHandle {
    local_addr: SocketAddr,
    task: JoinHandle<Result<(), ListenerError>>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Wait for the server to stop after shutdown was triggered.
    pub async fn wait(self) -> Result<(), ListenerError> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(ListenerError::Serve(std::io::Error::other(e))),
        }
    }
}

/// Build the Axum router with all middleware layers.
pub fn build_router(config: &ListenerConfig, state: AppState) -> Router {
    Router::new()
        .route(&config.callback_path, any(callback_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
}

async fn callback_handler(State(state): State<AppState>, request: Request<Body>) -> StatusCode {
    let request_id = request_id_of(&request);

    let body = match axum::body::to_bytes(request.into_body(), state.max_body_size).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Failed to receive callback");
            metrics::record_callback("unreadable");
            return StatusCode::OK;
        }
    };

    tracing::info!(
        request_id = %request_id,
        body = %String::from_utf8_lossy(&body),
        "< callback"
    );

    dispatch_event(state.sink.as_ref(), &body).await;
    StatusCode::OK
}

/// Decode a callback body and write it once per category it carries.
///
/// Every write receives the whole body, not the category's sub-value.
pub async fn dispatch_event(sink: &dyn EventSink, body: &[u8]) -> DispatchOutcome {
    let event = match Event::parse(body) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(
                error = %e,
                body = %String::from_utf8_lossy(body),
                "Dropping malformed event"
            );
            metrics::record_callback("rejected");
            return DispatchOutcome::Rejected;
        }
    };

    let mut written = 0;
    let mut failed = 0;
    for category in event.categories() {
        tracing::info!(category = %category, "writing event to file");
        match sink.write(category, body).await {
            Ok(_) => written += 1,
            Err(e) => {
                tracing::error!(category = %category, error = %e, "Failed to write event");
                failed += 1;
            }
        }
    }

    if written == 0 && failed == 0 {
        tracing::debug!(stream_source = event.stream_source, "Event carried no categories");
    }
    metrics::record_callback("accepted");
    DispatchOutcome::Accepted { written, failed }
}
