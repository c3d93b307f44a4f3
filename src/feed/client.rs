//! Feed API subscription client.
//!
//! # Responsibilities
//! - Create, update and delete the subscription on the live feed API
//! - Capture the server-assigned identifier
//! - Surface transport and status failures as typed errors
//!
//! Requests are never retried. Callers decide whether a failure matters.

use std::time::Duration;

use reqwest::{Client, Method};

use crate::config::{FeedConfig, UnsubscribeRoute};
use crate::feed::types::{Subscription, SubscriptionError};
use crate::observability::metrics;

/// Client for the feed API's subscription resource.
#[derive(Clone)]
pub struct SubscriptionClient {
    http: Client,
    /// API base without a trailing slash.
    api_url: String,
    unsubscribe_route: UnsubscribeRoute,
}

impl SubscriptionClient {
    /// Create a client for the configured feed API.
    pub fn new(config: &FeedConfig) -> Result<Self, SubscriptionError> {
        let api = url::Url::parse(&config.api_url)
            .map_err(|_| SubscriptionError::InvalidUrl(config.api_url.clone()))?;

        let mut builder = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs));
        if !config.use_system_proxy {
            builder = builder.no_proxy();
        }

        Ok(Self {
            http: builder.build()?,
            api_url: api.as_str().trim_end_matches('/').to_string(),
            unsubscribe_route: config.unsubscribe_route,
        })
    }

    /// Register the subscription and return its identifier.
    ///
    /// A record that already carries an id is updated in place first; if that
    /// fails a fresh subscription is created instead.
    pub async fn register(&self, subscription: &mut Subscription) -> Result<String, SubscriptionError> {
        if subscription.has_id() {
            match self.update(subscription).await {
                Ok(id) => return Ok(id),
                Err(e) => {
                    tracing::warn!(
                        subscription_id = %subscription.id,
                        error = %e,
                        "Failed to update existing subscription, creating a new one"
                    );
                }
            }
        }
        self.create(subscription).await
    }

    /// `POST {api}/subscriptions`
    pub async fn create(&self, subscription: &mut Subscription) -> Result<String, SubscriptionError> {
        let url = format!("{}/subscriptions", self.api_url);
        let result = self.send_subscription(Method::POST, url, subscription).await;
        metrics::record_subscription_request("create", result.is_ok());
        result
    }

    /// `PUT {api}/subscriptions/{id}`
    pub async fn update(&self, subscription: &mut Subscription) -> Result<String, SubscriptionError> {
        let url = self.resource_url("subscriptions", &subscription.id)?;
        let result = self.send_subscription(Method::PUT, url, subscription).await;
        metrics::record_subscription_request("update", result.is_ok());
        result
    }

    /// Delete the subscription through the configured route.
    ///
    /// Returns the feed API's reply body.
    pub async fn unregister(&self, id: &str) -> Result<String, SubscriptionError> {
        let segment = match self.unsubscribe_route {
            UnsubscribeRoute::Subscriptions => "subscriptions",
            UnsubscribeRoute::Unsubscribe => "unsubscribe",
        };
        let url = self.resource_url(segment, id)?;

        let result = self.send(Method::DELETE, &url, None).await;
        metrics::record_subscription_request("delete", result.is_ok());
        result
    }

    async fn send_subscription(
        &self,
        method: Method,
        url: String,
        subscription: &mut Subscription,
    ) -> Result<String, SubscriptionError> {
        let body = self.send(method, &url, Some(subscription)).await?;

        subscription.apply_reply(&body)?;
        if !subscription.has_id() {
            return Err(SubscriptionError::MissingId);
        }
        tracing::debug!(url = %url, reply = %body, "Subscription accepted");
        Ok(subscription.id.clone())
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        subscription: Option<&Subscription>,
    ) -> Result<String, SubscriptionError> {
        tracing::debug!(method = %method, url = %url, "Feed API request");

        let mut request = self.http.request(method, url);
        if let Some(subscription) = subscription {
            request = request.json(subscription);
        }
        let response = request.send().await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(SubscriptionError::Server {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    fn resource_url(&self, segment: &str, id: &str) -> Result<String, SubscriptionError> {
        if id.is_empty() || id.contains('/') {
            return Err(SubscriptionError::InvalidUrl(format!("{}/{}/{}", self.api_url, segment, id)));
        }
        Ok(format!("{}/{}/{}", self.api_url, segment, id))
    }

    /// Base URL requests are issued against.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }
}

impl std::fmt::Debug for SubscriptionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionClient")
            .field("api_url", &self.api_url)
            .field("unsubscribe_route", &self.unsubscribe_route)
            .finish()
    }
}
