//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check that every URL the subscription client builds from is well formed
//! - Validate value ranges (timeouts > 0, permission bits)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: CaptureConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::CaptureConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address '{0}' is not a socket address")]
    BindAddress(String),

    #[error("listener.callback_path '{0}' must start with '/'")]
    CallbackPath(String),

    #[error("listener.max_body_size must be greater than zero")]
    MaxBodySize,

    #[error("{field} '{value}' is not a valid http(s) URL")]
    Url { field: &'static str, value: String },

    #[error("feed.categories must name at least one category")]
    NoCategories,

    #[error("feed.categories contains an empty name")]
    EmptyCategory,

    #[error("feed.subscription_id must not be blank when set")]
    BlankSubscriptionId,

    #[error("feed.request_timeout_secs must be greater than zero")]
    RequestTimeout,

    #[error("output.directory must not be empty")]
    OutputDirectory,

    #[error("{field} {mode:#o} has bits outside 0o777")]
    Mode { field: &'static str, mode: u32 },

    #[error("observability.metrics_address '{0}' is not a socket address")]
    MetricsAddress(String),
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &CaptureConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let listener = &config.listener;
    if listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(listener.bind_address.clone()));
    }
    if !listener.callback_path.starts_with('/') {
        errors.push(ValidationError::CallbackPath(listener.callback_path.clone()));
    }
    if listener.max_body_size == 0 {
        errors.push(ValidationError::MaxBodySize);
    }

    let feed = &config.feed;
    check_url("feed.api_url", &feed.api_url, &mut errors);
    check_url("feed.callback_url", &feed.callback_url, &mut errors);
    if feed.categories.is_empty() {
        errors.push(ValidationError::NoCategories);
    } else if feed.categories.iter().any(|c| c.trim().is_empty()) {
        errors.push(ValidationError::EmptyCategory);
    }
    if feed
        .subscription_id
        .as_deref()
        .is_some_and(|id| id.trim().is_empty())
    {
        errors.push(ValidationError::BlankSubscriptionId);
    }
    if feed.request_timeout_secs == 0 {
        errors.push(ValidationError::RequestTimeout);
    }

    let output = &config.output;
    if output.directory.trim().is_empty() {
        errors.push(ValidationError::OutputDirectory);
    }
    if output.file_mode & !0o777 != 0 {
        errors.push(ValidationError::Mode { field: "output.file_mode", mode: output.file_mode });
    }
    if output.dir_mode & !0o777 != 0 {
        errors.push(ValidationError::Mode { field: "output.dir_mode", mode: output.dir_mode });
    }

    let observability = &config.observability;
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(observability.metrics_address.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_url(field: &'static str, value: &str, errors: &mut Vec<ValidationError>) {
    let valid = url::Url::parse(value)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.has_host())
        .unwrap_or(false);
    if !valid {
        errors.push(ValidationError::Url { field, value: value.to_string() });
    }
}
