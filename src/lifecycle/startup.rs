//! Startup and shutdown orchestration.
//!
//! # Responsibilities
//! - Prepare the output directory
//! - Start the callback listener and wait until it is serving
//! - Register the feed subscription
//! - On termination, unsubscribe and stop the listener
//!
//! # Design Decisions
//! - Listener bind failure is always fatal
//! - Directory and subscription failures follow the configured error policy
//! - The subscription is registered only after the listener is ready, so the
//!   first pushed event cannot hit a closed port

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;

use crate::config::{CaptureConfig, ErrorAction};
use crate::feed::{Subscription, SubscriptionClient, SubscriptionError};
use crate::http::{CallbackServer, ServerHandle};
use crate::lifecycle::{signals, Shutdown};
use crate::net::ListenerError;
use crate::observability::metrics;
use crate::store::{OutputStore, StoreError};

/// Conditions that stop the bridge.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("output directory unavailable: {0}")]
    Directory(#[source] StoreError),

    #[error("callback listener failed: {0}")]
    Listener(#[from] ListenerError),

    #[error("subscription client could not be created: {0}")]
    Client(#[source] SubscriptionError),

    #[error("subscription registration failed: {0}")]
    Subscription(#[source] SubscriptionError),
}

/// Build the subscription record described by the configuration.
pub fn configured_subscription(config: &CaptureConfig) -> Subscription {
    let subscription = Subscription::accept_all(&config.feed.callback_url, &config.feed.categories);
    match &config.feed.subscription_id {
        Some(id) => subscription.with_id(id.clone()),
        None => subscription,
    }
}

/// Run startup: directory → listener → subscription.
pub async fn start(config: CaptureConfig) -> Result<RunningCapture, CaptureError> {
    let store = Arc::new(OutputStore::new(&config.output));
    if let Err(e) = store.ensure_directory().await {
        tracing::error!(
            directory = %store.directory().display(),
            error = %e,
            "Failed to create event directory"
        );
        if config.errors.on_directory_error == ErrorAction::Terminate {
            return Err(CaptureError::Directory(e));
        }
    }

    let client = SubscriptionClient::new(&config.feed).map_err(CaptureError::Client)?;

    let shutdown = Shutdown::new();
    let server = CallbackServer::new(config.listener.clone(), store)
        .start(shutdown.subscribe())
        .await?;

    let mut subscription = configured_subscription(&config);
    let registered = match client.register(&mut subscription).await {
        Ok(id) => {
            tracing::info!(
                subscription_id = %id,
                callback_url = %subscription.callback_url,
                categories = subscription.filters.len(),
                "Subscribed to live feed"
            );
            metrics::record_subscription_active(true);
            true
        }
        Err(e) => {
            tracing::error!(
                api_url = %client.api_url(),
                kind = e.kind(),
                error = %e,
                "Failed to register subscription"
            );
            if config.errors.on_subscription_error == ErrorAction::Terminate {
                shutdown.trigger();
                if let Err(stop) = server.wait().await {
                    tracing::warn!(error = %stop, "Callback server did not stop cleanly");
                }
                return Err(CaptureError::Subscription(e));
            }
            false
        }
    };

    Ok(RunningCapture {
        config,
        client,
        subscription,
        registered,
        shutdown,
        server,
    })
}

/// Run until SIGINT/SIGTERM, then shut down.
pub async fn run(config: CaptureConfig) -> Result<(), CaptureError> {
    let running = start(config).await?;
    tracing::info!(address = %running.local_addr(), "Capturing events");

    signals::termination().await;
    running.shutdown().await
}

/// A started bridge: listener serving, subscription (maybe) registered.
pub struct RunningCapture {
    config: CaptureConfig,
    client: SubscriptionClient,
    subscription: Subscription,
    registered: bool,
    shutdown: Shutdown,
    server: ServerHandle,
}

impl RunningCapture {
    /// Address the callback listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.server.local_addr()
    }

    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    /// Whether the feed accepted the subscription.
    pub fn is_subscribed(&self) -> bool {
        self.registered
    }

    pub fn is_serving(&self) -> bool {
        self.server.is_running()
    }

    /// Unsubscribe, then stop the listener.
    pub async fn shutdown(self) -> Result<(), CaptureError> {
        if self.registered && self.config.feed.unsubscribe_on_shutdown {
            match self.client.unregister(&self.subscription.id).await {
                Ok(reply) => tracing::info!(
                    subscription_id = %self.subscription.id,
                    reply = %reply,
                    "Unsubscribed from live feed"
                ),
                Err(e) => tracing::error!(
                    subscription_id = %self.subscription.id,
                    kind = e.kind(),
                    error = %e,
                    "Failed to delete subscription"
                ),
            }
            metrics::record_subscription_active(false);
        }

        tracing::debug!(receivers = self.shutdown.receiver_count(), "Signalling shutdown");
        self.shutdown.trigger();
        self.server.wait().await?;
        tracing::info!("Shutdown complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_subscription() {
        let mut config = CaptureConfig::default();
        config.feed.callback_url = "http://10.1.2.3:8787/callback".into();
        config.feed.categories = vec!["ANCHOR_EVENT".into(), "COMMIT_ENTRY".into()];

        let sub = configured_subscription(&config);
        assert!(!sub.has_id());
        assert_eq!(sub.callback_url, "http://10.1.2.3:8787/callback");
        assert_eq!(
            sub.filters.categories().collect::<Vec<_>>(),
            vec!["ANCHOR_EVENT", "COMMIT_ENTRY"]
        );

        config.feed.subscription_id = Some("17".into());
        assert_eq!(configured_subscription(&config).id, "17");
    }

    #[tokio::test]
    async fn test_bind_failure_is_fatal() {
        let blocker = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let tmp = tempfile::tempdir().unwrap();

        let mut config = CaptureConfig::default();
        config.listener.bind_address = blocker.local_addr().unwrap().to_string();
        config.output.directory = tmp.path().to_string_lossy().into_owned();

        let err = start(config).await.err().unwrap();
        assert!(matches!(err, CaptureError::Listener(ListenerError::Bind(_))));
    }

    #[tokio::test]
    async fn test_directory_failure_policy() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("events");
        std::fs::write(&blocker, b"file").unwrap();

        let mut config = CaptureConfig::default();
        config.output.directory = blocker.to_string_lossy().into_owned();
        config.errors.on_directory_error = ErrorAction::Terminate;

        let err = start(config).await.err().unwrap();
        assert!(matches!(err, CaptureError::Directory(_)));
    }
}
